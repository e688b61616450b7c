//! XDF's variable-length integer: a 1-byte length prefix (itself `1`, `4`,
//! or `8`) followed by that many little-endian bytes.

use std::io::{self, Read};

use crate::error::ChunkFault;
use crate::primitive::{read_u64, read_u8};

/// Reads one variable-length integer, returning its value.
///
/// Any length-prefix byte other than `1`, `4`, or `8` is reported as
/// [`ChunkFault::MalformedVarInt`] rather than an I/O error, so the chunk
/// driver can tell "ran out of bytes" apart from "framing is wrong" when
/// deciding whether to invoke the boundary scanner.
pub(crate) fn read_varlen_int<R: Read>(r: &mut R) -> Result<u64, ChunkFault> {
    let nbytes = read_u8(r)?;
    match nbytes {
        1 => Ok(read_u8(r)? as u64),
        4 => {
            let mut buf = [0u8; 4];
            r.read_exact(&mut buf)?;
            Ok(u32::from_le_bytes(buf) as u64)
        }
        8 => read_u64(r),
        other => Err(ChunkFault::MalformedVarInt(other)),
    }
}

/// Like [`read_varlen_int`] but distinguishes a clean EOF (no bytes at all
/// before the length prefix) from a truncated read, so the chunk loop can
/// tell "end of file" from "corruption" per §4.1 step 2.
pub(crate) fn read_varlen_int_or_eof<R: Read>(r: &mut R) -> io::Result<Option<u64>> {
    let mut prefix = [0u8; 1];
    match r.read(&mut prefix)? {
        0 => return Ok(None),
        n => {
            // `Read::read` may return a short read even when more data is
            // available; for a 1-byte buffer this only happens at EOF.
            debug_assert_eq!(n, 1);
        }
    }
    let nbytes = prefix[0];
    let value = match nbytes {
        1 => read_u8(r)? as u64,
        4 => {
            let mut buf = [0u8; 4];
            r.read_exact(&mut buf)?;
            u32::from_le_bytes(buf) as u64
        }
        8 => read_u64(r)?,
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed varint length prefix {other}"),
            ))
        }
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn one_byte() {
        let mut c = Cursor::new(vec![1u8, 42]);
        assert_eq!(read_varlen_int(&mut c).unwrap(), 42);
    }

    #[test]
    fn four_byte() {
        let mut c = Cursor::new(vec![4u8, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(read_varlen_int(&mut c).unwrap(), 0x1234_5678);
    }

    #[test]
    fn eight_byte() {
        let mut bytes = vec![8u8];
        bytes.extend_from_slice(&1_000_000_000_000u64.to_le_bytes());
        let mut c = Cursor::new(bytes);
        assert_eq!(read_varlen_int(&mut c).unwrap(), 1_000_000_000_000);
    }

    #[test]
    fn bad_prefix() {
        let mut c = Cursor::new(vec![3u8, 1, 2, 3]);
        match read_varlen_int(&mut c) {
            Err(ChunkFault::MalformedVarInt(3)) => {}
            other => panic!("expected MalformedVarInt(3), got {other:?}"),
        }
    }

    #[test]
    fn eof_is_none() {
        let mut c = Cursor::new(Vec::<u8>::new());
        assert_eq!(read_varlen_int_or_eof(&mut c).unwrap(), None);
    }
}
