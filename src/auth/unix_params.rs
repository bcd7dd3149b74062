use crate::read_slice_bytes;
use crate::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use smallvec::SmallVec;
use std::io::{Cursor, Write};

/// Maximum number of bytes in the `machine name` field (RFC 1831 appendix A).
pub const MAX_MACHINE_NAME_LEN: u32 = 255;

/// Maximum number of auxiliary group IDs carried in an `AUTH_SYS` credential.
pub const MAX_AUX_GIDS: usize = 16;

/// `AuthUnixParams` represents the structure referred to as both `AUTH_UNIX`
/// and `AUTH_SYS` in the various RFCs, used to idenitfy the client as a Unix
/// user.
///
/// The structure is implemented as specified in `APPENDIX A` of
/// [RFC1831](https://tools.ietf.org/html/rfc1831).
///
/// These values are trivial to forge and provide no actual security.
#[derive(Debug, PartialEq, Clone)]
pub struct AuthUnixParams<'a> {
    stamp: u32,
    machine_name: &'a [u8],
    uid: u32,
    gid: u32,
    gids: SmallVec<[u32; MAX_AUX_GIDS]>,
}

impl<'a> AuthUnixParams<'a> {
    /// Initialise a new `AuthUnixParams` instance containing the specified
    /// unix account identifiers.
    pub fn new(
        stamp: u32,
        machine_name: &'a [u8],
        uid: u32,
        gid: u32,
        gids: SmallVec<[u32; MAX_AUX_GIDS]>,
    ) -> Self {
        AuthUnixParams {
            stamp,
            machine_name,
            uid,
            gid,
            gids,
        }
    }

    /// Constructs a new `AuthUnixParams` by parsing the wire format read from
    /// `r`, validating it has read exactly `expected_len` number of bytes.
    ///
    /// `from_cursor` advances the position of `r` to the end of the `AUTH_UNIX`
    /// structure.
    pub(crate) fn from_cursor(r: &mut Cursor<&'a [u8]>, expected_len: u32) -> Result<Self, Error> {
        // Get the start length the parser can validate it read the expected
        // amount of data at the end of the function
        let start_pos = r.position();

        // Read the stamp
        let stamp = r.read_u32::<BigEndian>()?;

        // Read the variable length name
        let name_len = r.read_u32::<BigEndian>()?;
        if name_len > MAX_MACHINE_NAME_LEN {
            return Err(Error::InvalidLength);
        }

        // Read the string without copying
        let machine_name = read_slice_bytes(r, name_len)?;
        r.set_position(r.position() + crate::opaque::pad_length(name_len) as u64);

        // UID & GID
        let uid = r.read_u32::<BigEndian>()?;
        let gid = r.read_u32::<BigEndian>()?;

        // Gids
        let gids_count = r.read_u32::<BigEndian>()? as usize;
        if gids_count > MAX_AUX_GIDS {
            return Err(Error::InvalidAuthData);
        }
        let mut gids = SmallVec::<[u32; MAX_AUX_GIDS]>::new();
        for _ in 0..gids_count {
            gids.push(r.read_u32::<BigEndian>()?);
        }

        // Validate the parser read the expected amount of data to construct
        // this type
        if (r.position() - start_pos) != expected_len as u64 {
            return Err(Error::InvalidAuthData);
        }

        Ok(AuthUnixParams {
            stamp,
            machine_name,
            uid,
            gid,
            gids,
        })
    }

    /// Serialises this `AuthUnixParams` into `buf`, advancing the cursor
    /// position by [`serialised_len`](AuthUnixParams::serialised_len) bytes.
    pub(crate) fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_u32::<BigEndian>(self.stamp)?;
        buf.write_u32::<BigEndian>(self.machine_name.len() as u32)?;
        buf.write_all(self.machine_name)?;
        let pad = crate::opaque::pad_length(self.machine_name.len() as u32) as usize;
        if pad > 0 {
            buf.write_all(&[0u8; 3][..pad])?;
        }
        buf.write_u32::<BigEndian>(self.uid)?;
        buf.write_u32::<BigEndian>(self.gid)?;

        // Gids array length prefix
        buf.write_u32::<BigEndian>(self.gids.len() as u32)?;

        // Gids values
        for g in &self.gids {
            buf.write_u32::<BigEndian>(*g)?;
        }
        Ok(())
    }

    /// An arbitrary ID generated by the caller.
    pub fn stamp(&self) -> u32 {
        self.stamp
    }

    /// The hostname of the caller's machine.
    pub fn machine_name(&self) -> &'a [u8] {
        self.machine_name
    }

    /// The hostname of the caller's machine as a reference to a UTF8 string.
    pub fn machine_name_str(&self) -> Result<&'a str, Error> {
        std::str::from_utf8(self.machine_name).map_err(Error::InvalidMachineName)
    }

    /// The caller's Unix user ID.
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// The caller's primary Unix group ID.
    pub fn gid(&self) -> u32 {
        self.gid
    }

    /// Returns the set of Unix group IDs the caller is a member of, in
    /// addition to [`gid`](Self::gid).
    pub fn gids(&self) -> &[u32] {
        &self.gids
    }

    /// Returns the on-wire length of this structure once serialised
    /// (excluding the flavor discriminator and outer length prefix that
    /// [`AuthFlavor`](crate::auth::AuthFlavor) adds).
    pub(crate) fn serialised_len(&self) -> u32 {
        // uid, gid, stamp
        let mut l = std::mem::size_of::<u32>() * 3;

        // machine_name length u32 + bytes + padding
        let name_len = self.machine_name.len() as u32;
        l += std::mem::size_of::<u32>()
            + name_len as usize
            + crate::opaque::pad_length(name_len) as usize;

        // gids length prefix u32 + values
        l += (self.gids.len() + 1) * std::mem::size_of::<u32>();

        l as u32
    }
}
