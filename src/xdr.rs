//! Free-standing XDR helpers that sit above [`crate::opaque::Opaque`] for the
//! handful of wire shapes the protocol surfaces need that aren't simply
//! "one opaque blob": fixed-size file handles, and arrays of `u32`.
//!
//! Every type here honours XDR's 4-byte alignment (RFC 4506 §3): all of the
//! variable-length helpers pad to a multiple of 4 bytes, and decoding
//! validates length prefixes against the remaining buffer rather than
//! trusting them.

use std::io::{Cursor, Write};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{Error, Opaque};

/// Maximum size in bytes of an NFSv3 file handle (RFC 1813 §2.3.3).
pub const NFS3_FHSIZE: usize = 64;

/// Reads a variable-length opaque NFSv3 file handle from `r`.
pub(crate) fn read_file_handle<'a>(r: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    Ok(Opaque::from_wire(r, NFS3_FHSIZE)?.into_payload())
}

/// Writes a variable-length opaque file handle into `buf`.
pub(crate) fn write_file_handle<W: Write>(buf: &mut W, fh: &[u8]) -> Result<(), std::io::Error> {
    Opaque::from_user_payload(fh).serialise_into(buf)
}

/// Reads an XDR `string` (length-prefixed, NUL-free, padded) from `r`.
pub(crate) fn read_string<'a>(r: &mut Cursor<&'a [u8]>, max_len: usize) -> Result<&'a [u8], Error> {
    Ok(Opaque::from_wire(r, max_len)?.into_payload())
}

/// Writes an XDR `string` into `buf`.
pub(crate) fn write_string<W: Write>(buf: &mut W, s: &[u8]) -> Result<(), std::io::Error> {
    Opaque::from_user_payload(s).serialise_into(buf)
}

/// Skips over an opaque blob at the cursor's current position without
/// copying it, honouring the length prefix and padding.
///
/// Used to step over NFS attribute bodies this client doesn't interpret.
pub(crate) fn skip_opaque(r: &mut Cursor<&[u8]>, max_len: usize) -> Result<(), Error> {
    Opaque::from_wire(r, max_len)?;
    Ok(())
}

/// Skips over an XDR array of `u32`s without copying the values or
/// imposing a fixed upper bound on the element count.
///
/// Still validates the count against what actually remains in the buffer,
/// so a bogus or hostile length prefix can't seek the cursor past the end
/// of the data.
pub(crate) fn skip_u32_array(r: &mut Cursor<&[u8]>) -> Result<(), Error> {
    let count = r.read_u32::<BigEndian>()? as u64;
    let skip_bytes = count
        .checked_mul(4)
        .ok_or(Error::InvalidLength)?;

    let remaining = r.get_ref().len() as u64 - r.position();
    if skip_bytes > remaining {
        return Err(Error::InvalidLength);
    }

    r.set_position(r.position() + skip_bytes);
    Ok(())
}
