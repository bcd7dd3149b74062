//! MOUNT v3 ([RFC 1813] Appendix I), restricted to `MNT` and `UMNT`.
//!
//! [RFC 1813]: https://datatracker.ietf.org/doc/html/rfc1813

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

use crate::xdr::{read_file_handle, skip_u32_array, write_string};
use crate::Error;

/// MOUNT program number.
pub const PROGRAM: u32 = 100005;

/// MOUNT version this client speaks.
pub const VERSION: u32 = 3;

/// The `MNT` procedure number.
pub const PROC_MNT: u32 = 1;

/// The `UMNT` procedure number.
pub const PROC_UMNT: u32 = 3;

/// `mountstat3` success code.
const MNT_OK: u32 = 0;

/// Encodes the arguments shared by `MNT` and `UMNT`: a single directory
/// path string.
pub fn encode_dirpath(dirpath: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + dirpath.len() + 3);
    write_string(&mut buf, dirpath.as_bytes()).expect("vec write");
    buf
}

/// The decoded result of a successful `MNT` call.
#[derive(Debug, PartialEq)]
pub struct MountReply {
    /// The root file handle of the mounted export.
    pub file_handle: Vec<u8>,
}

/// Decodes an `MNT` reply.
///
/// A non-zero `mountstat3` is reported as [`Error::Remote`] with the
/// original status code preserved. The auth flavor list that follows a
/// successful reply is skipped (to keep the cursor consistent) but
/// discarded — this client always authenticates with `AUTH_SYS`. The list
/// is not bounded to a fixed element count; a server is free to advertise
/// as many flavors as it likes.
pub fn decode_mnt_reply(payload: &[u8]) -> Result<MountReply, Error> {
    let mut c = Cursor::new(payload);
    let status = c.read_u32::<BigEndian>()?;
    if status != MNT_OK {
        return Err(Error::Remote(status));
    }

    let file_handle = read_file_handle(&mut c)?.to_vec();
    skip_u32_array(&mut c)?;

    Ok(MountReply { file_handle })
}
