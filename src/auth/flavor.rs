use std::convert::TryFrom;
use std::io::{Cursor, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{auth::AuthUnixParams, Error, Opaque};

const AUTH_NONE: u32 = 0;
const AUTH_UNIX: u32 = 1;

/// Maximum size in bytes of the opaque body carried by `AUTH_NONE`.
const MAX_AUTH_NONE_LEN: usize = 200;

/// Maximum on-wire length in bytes of the fixed `AUTH_UNIX` credential body
/// (stamp + machine name + uid + gid + aux gids), matching the upstream
/// limit `nfs-utils`/the RFC 5531 reference implementation imposes.
const MAX_AUTH_UNIX_LEN: usize = 400;

/// The two [auth flavors](https://tools.ietf.org/html/rfc5531#section-8.2)
/// this client speaks.
///
/// A server reply carrying any other flavor (`AUTH_SHORT`, `AUTH_DH`,
/// `RPCSEC_GSS`, or anything unrecognised) is surfaced as
/// [`Error::Unsupported`] rather than preserved as an opaque value; this
/// client never inspects a credential or verifier it didn't itself
/// construct.
#[derive(Debug, PartialEq, Clone)]
pub enum AuthFlavor<'a> {
    /// `AUTH_NONE`, with the opaque body the protocol allows (almost always
    /// absent).
    AuthNone(Option<&'a [u8]>),

    /// `AUTH_UNIX`/`AUTH_SYS` and the fields it carries.
    AuthUnix(AuthUnixParams<'a>),
}

impl<'a> AuthFlavor<'a> {
    /// Parses an `AuthFlavor` from the wire format read from `r`.
    pub(crate) fn from_cursor(r: &mut Cursor<&'a [u8]>) -> Result<Self, Error> {
        let flavor = r.read_u32::<BigEndian>()?;

        match flavor {
            AUTH_NONE => Self::new_none(r),
            AUTH_UNIX => Self::new_unix(r),
            _ => Err(Error::Unsupported("unsupported auth flavor")),
        }
    }

    fn new_none(r: &mut Cursor<&'a [u8]>) -> Result<Self, Error> {
        let payload = Opaque::from_wire(r, MAX_AUTH_NONE_LEN)?.into_payload();
        if payload.is_empty() {
            return Ok(AuthFlavor::AuthNone(None));
        }

        Ok(AuthFlavor::AuthNone(Some(payload)))
    }

    fn new_unix(r: &mut Cursor<&'a [u8]>) -> Result<Self, Error> {
        let len = r.read_u32::<BigEndian>()?;
        if len > MAX_AUTH_UNIX_LEN as u32 {
            return Err(Error::InvalidLength);
        }

        Ok(AuthFlavor::AuthUnix(AuthUnixParams::from_cursor(r, len)?))
    }

    /// Serialises this auth flavor into `buf`.
    pub(crate) fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_u32::<BigEndian>(self.id())?;

        match self {
            Self::AuthNone(Some(data)) => Opaque::from_user_payload(data).serialise_into(&mut buf),
            Self::AuthNone(None) => buf.write_u32::<BigEndian>(0),
            Self::AuthUnix(p) => {
                buf.write_u32::<BigEndian>(p.serialised_len())?;
                p.serialise_into(buf)
            }
        }
    }

    /// Returns the ID value used to identify the variant in the wire
    /// protocol.
    pub fn id(&self) -> u32 {
        match self {
            Self::AuthNone(_) => AUTH_NONE,
            Self::AuthUnix(_) => AUTH_UNIX,
        }
    }

    /// Returns the on-wire length of this auth flavor once serialised,
    /// including the discriminator and length prefix.
    pub fn serialised_len(&self) -> u32 {
        // Flavor discriminator.
        let mut l = 4;

        l += match self {
            Self::AuthNone(None) => 4,
            Self::AuthNone(Some(data)) => Opaque::from_user_payload(data).serialised_len(),
            Self::AuthUnix(p) => 4 + p.serialised_len(),
        };

        l
    }
}

impl<'a> TryFrom<&'a [u8]> for AuthFlavor<'a> {
    type Error = Error;

    fn try_from(v: &'a [u8]) -> Result<Self, Self::Error> {
        let mut c = Cursor::new(v);
        AuthFlavor::from_cursor(&mut c)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_auth_unix_unaligned_machinename() {
        #[rustfmt::skip]
        // Credentials
        //     Flavor: AUTH_UNIX (1)
        //     Length: 36
        //     Stamp: 0x00000000
        //     Machine Name: LAPTOP-1QQBPDGM
        //         length: 15
        //         contents: LAPTOP-1QQBPDGM
        //     UID: 0
        //     GID: 0
        //     Auxiliary GIDs (0)
        const RAW: [u8; 44] = hex!(
            "0000000100000024000000000000000f4c4150544f502d315151425044474d00000000000000000000000000"
        );

        let mut c = Cursor::new(RAW.as_ref());
        let f = AuthFlavor::from_cursor(&mut c).expect("failed to parse message");
        assert_eq!(f.serialised_len(), 44);
        assert_eq!(f.id(), AUTH_UNIX);

        let params = match f {
            AuthFlavor::AuthUnix(ref p) => p,
            _ => panic!("wrong auth"),
        };

        assert_eq!(params.uid(), 0);

        let mut buf = Vec::new();
        f.serialise_into(&mut buf).expect("serialise failed");
        assert_eq!(buf.as_slice(), RAW.as_ref());
    }

    #[test]
    fn test_auth_unix() {
        #[rustfmt::skip]
        // Credentials
        //     Flavor: AUTH_UNIX (1)
        //     Length: 84
        //     Stamp: 0x00000000
        //     Machine Name: <EMPTY>
        //     UID: 501
        //     GID: 20
        //     Auxiliary GIDs (16)
        const RAW: [u8; 92] = hex!(
            "00000001000000540000000000000000000001f50000001400000010000001f500
            00000c000000140000003d0000004f000000500000005100000062000002bd00000
            02100000064000000cc000000fa0000018b0000018e0000018f"
        );

        let mut c = Cursor::new(RAW.as_ref());
        let f = AuthFlavor::from_cursor(&mut c).expect("failed to parse message");
        assert_eq!(f.serialised_len(), 92);
        assert_eq!(f.id(), AUTH_UNIX);

        let params = match f {
            AuthFlavor::AuthUnix(ref p) => p,
            _ => panic!("wrong auth"),
        };

        assert_eq!(params.uid(), 501);

        let mut buf = Vec::new();
        f.serialise_into(&mut buf).expect("serialise failed");
        assert_eq!(buf.as_slice(), RAW.as_ref());
    }

    #[test]
    fn test_auth_none_empty() {
        const RAW: [u8; 8] = hex!("00000000 00000000");

        let mut c = Cursor::new(RAW.as_ref());
        let f = AuthFlavor::from_cursor(&mut c).expect("failed to parse message");
        assert_eq!(f, AuthFlavor::AuthNone(None));
        assert_eq!(f.serialised_len(), 8);

        let mut buf = Vec::new();
        f.serialise_into(&mut buf).expect("serialise failed");
        assert_eq!(buf.as_slice(), RAW.as_ref());
    }

    #[test]
    fn test_rejects_unsupported_flavor() {
        const RAW: [u8; 8] = hex!("000000FF 00000000");
        let mut c = Cursor::new(RAW.as_ref());
        assert_eq!(
            AuthFlavor::from_cursor(&mut c),
            Err(Error::Unsupported("unsupported auth flavor"))
        );
    }
}
