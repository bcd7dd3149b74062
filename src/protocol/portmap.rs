//! Portmap v2 ([RFC 1833]), restricted to the single procedure this client
//! needs: resolving a program/version to the TCP port it's listening on.
//!
//! [RFC 1833]: https://datatracker.ietf.org/doc/html/rfc1833

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::Error;

/// Portmap program number.
pub const PROGRAM: u32 = 100000;

/// Portmap version this client speaks.
pub const VERSION: u32 = 2;

/// The `GETPORT` procedure number.
pub const PROC_GETPORT: u32 = 3;

/// IP protocol number for TCP, as used in the `getport` arguments.
const IPPROTO_TCP: u32 = 6;

/// Encodes the arguments for a `GETPORT` call resolving `(program,
/// version)` over TCP.
pub fn encode_getport(program: u32, version: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    buf.write_u32::<BigEndian>(program).expect("vec write");
    buf.write_u32::<BigEndian>(version).expect("vec write");
    buf.write_u32::<BigEndian>(IPPROTO_TCP).expect("vec write");
    buf.write_u32::<BigEndian>(0).expect("vec write"); // port, ignored on the way in
    buf
}

/// Decodes a `GETPORT` reply, returning the resolved port.
///
/// A reply of port `0` means the program/version pair isn't registered and
/// is reported as [`Error::NotFound`].
pub fn decode_getport_reply(payload: &[u8]) -> Result<u16, Error> {
    let mut c = Cursor::new(payload);
    let port = c.read_u32::<BigEndian>()?;
    if port == 0 {
        return Err(Error::NotFound);
    }
    u16::try_from(port).map_err(|_| Error::InvalidLength)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_getport() {
        let got = encode_getport(100005, 3);
        assert_eq!(
            got,
            [0, 1, 134, 165, 0, 0, 0, 3, 0, 0, 0, 6, 0, 0, 0, 0].to_vec()
        );
    }

    #[test]
    fn test_decode_getport_reply() {
        let raw = 2049u32.to_be_bytes();
        assert_eq!(decode_getport_reply(&raw).unwrap(), 2049);
    }

    #[test]
    fn test_decode_getport_reply_not_registered() {
        let raw = 0u32.to_be_bytes();
        assert_eq!(decode_getport_reply(&raw), Err(Error::NotFound));
    }
}
