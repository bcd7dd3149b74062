//! NFS v3 ([RFC 1813]), restricted to `LOOKUP` and `READ` — the only two
//! procedures a read-only, single-file fetch needs.
//!
//! [RFC 1813]: https://datatracker.ietf.org/doc/html/rfc1813

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::xdr::{read_file_handle, write_file_handle, write_string};
use crate::Error;

/// NFS program number.
pub const PROGRAM: u32 = 100003;

/// NFS version this client speaks.
pub const VERSION: u32 = 3;

/// The `LOOKUP` procedure number.
pub const PROC_LOOKUP: u32 = 3;

/// The `READ` procedure number.
pub const PROC_READ: u32 = 6;

/// `nfsstat3` success code.
const NFS3_OK: u32 = 0;

/// Size in bytes of a `fattr3` structure (RFC 1813 §2.3.4): `ftype(4)
/// mode(4) nlink(4) uid(4) gid(4) size(8) used(8) rdev(8) fsid(8)
/// fileid(8) atime(8) mtime(8) ctime(8)`.
const FATTR3_LEN: usize = 84;

/// Byte offset of the `size` field within a `fattr3` block.
const FATTR3_SIZE_OFFSET: usize = 20;

/// Upper bound on the `data` payload accepted from a single `READ` reply;
/// purely a sanity limit against a misbehaving server, since this client
/// never requests more than `RSIZE` bytes in the first place.
const MAX_READ_PAYLOAD: usize = 1 << 20;

/// Encodes the arguments for a `LOOKUP` call resolving `name` within
/// `dir_fh`.
pub fn encode_lookup(dir_fh: &[u8], name: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + dir_fh.len() + name.len() + 8);
    write_file_handle(&mut buf, dir_fh).expect("vec write");
    write_string(&mut buf, name.as_bytes()).expect("vec write");
    buf
}

/// Decodes a `LOOKUP` reply, returning the resolved file handle.
///
/// The object and directory post-op attribute blocks that follow the file
/// handle are skipped without being interpreted.
pub fn decode_lookup_reply(payload: &[u8]) -> Result<Vec<u8>, Error> {
    let mut c = Cursor::new(payload);
    let status = c.read_u32::<BigEndian>()?;
    if status != NFS3_OK {
        return Err(Error::Remote(status));
    }

    let file_handle = read_file_handle(&mut c)?.to_vec();
    skip_post_op_attr(&mut c)?; // object attributes
    skip_post_op_attr(&mut c)?; // directory attributes

    Ok(file_handle)
}

/// Encodes the arguments for a `READ` call against `fh`, starting at
/// `offset` and requesting up to `count` bytes.
pub fn encode_read(fh: &[u8], offset: u64, count: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + fh.len() + 12);
    write_file_handle(&mut buf, fh).expect("vec write");
    buf.write_u64::<BigEndian>(offset).expect("vec write");
    buf.write_u32::<BigEndian>(count).expect("vec write");
    buf
}

/// The decoded result of a successful `READ` call.
#[derive(Debug, PartialEq)]
pub struct ReadReply<'a> {
    /// The file's total size, if the server included post-op attributes.
    ///
    /// Absent when the server omits attributes; callers must tolerate an
    /// unknown file length in that case.
    pub size: Option<u64>,

    /// The number of bytes the server reports having returned. Always use
    /// this (not `data.len()`) to advance the read offset.
    pub count: u32,

    /// Whether this reply reached the end of the file.
    pub eof: bool,

    /// The bytes read, verbatim.
    pub data: &'a [u8],
}

/// Decodes a `READ` reply.
pub fn decode_read_reply(payload: &[u8]) -> Result<ReadReply<'_>, Error> {
    let mut c = Cursor::new(payload);
    let status = c.read_u32::<BigEndian>()?;
    if status != NFS3_OK {
        return Err(Error::Remote(status));
    }

    let size = read_post_op_attr_size(&mut c)?;
    let count = c.read_u32::<BigEndian>()?;
    let eof = c.read_u32::<BigEndian>()? != 0;
    let data = crate::xdr::read_string(&mut c, MAX_READ_PAYLOAD)?;

    Ok(ReadReply {
        size,
        count,
        eof,
        data,
    })
}

/// Reads a `post_op_attr`, returning the `size` field when attributes are
/// present.
fn read_post_op_attr_size(c: &mut Cursor<&[u8]>) -> Result<Option<u64>, Error> {
    let present = c.read_u32::<BigEndian>()?;
    if present == 0 {
        return Ok(None);
    }

    let data = *c.get_ref();
    let start = c.position() as usize;
    let end = start + FATTR3_LEN;
    if end > data.len() {
        return Err(Error::InvalidLength);
    }

    let size_bytes = &data[start + FATTR3_SIZE_OFFSET..start + FATTR3_SIZE_OFFSET + 8];
    let size = u64::from_be_bytes(size_bytes.try_into().expect("8 byte slice"));

    c.set_position(end as u64);
    Ok(Some(size))
}

/// Skips a `post_op_attr` block without interpreting its contents.
fn skip_post_op_attr(c: &mut Cursor<&[u8]>) -> Result<(), Error> {
    let present = c.read_u32::<BigEndian>()?;
    if present == 0 {
        return Ok(());
    }

    let data = *c.get_ref();
    let end = c.position() as usize + FATTR3_LEN;
    if end > data.len() {
        return Err(Error::InvalidLength);
    }

    c.set_position(end as u64);
    Ok(())
}
