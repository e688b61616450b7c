//! Resynchronization after a corrupt or truncated chunk.
//!
//! Grounded on `rust-embedded-itm`'s older `decoder.rs`, which tolerates a
//! partial trailing read rather than erroring outright; here the equivalent
//! tolerance is a forward scan for a known sentinel instead of a lenient
//! `read_exact`, since XDF chunks don't self-announce truncation.

use std::io::{Read, Seek, SeekFrom};

/// 16-byte marker inserted periodically between chunks so a corrupted
/// stream can be resynchronized.
pub(crate) const SENTINEL: [u8; 16] = [
    0x43, 0xA5, 0x46, 0xDC, 0xCB, 0xF5, 0x41, 0x0F, 0xB3, 0x0E, 0xD5, 0x46, 0x73, 0x83, 0xCB, 0xE4,
];

const BLOCK_SIZE: usize = 1 << 20;
const OVERLAP: usize = SENTINEL.len() - 1;

/// Scans forward from the reader's current position for [`SENTINEL`].
///
/// On a match, seeks the reader to one byte past the sentinel's
/// second-to-last byte (`match_offset + 15`), i.e. positioned so the very
/// next byte read is the first byte of a new chunk's length prefix. Returns
/// `true` on a match, `false` if the sentinel was not found before EOF (in
/// which case the reader is left at EOF and the caller should stop).
///
/// Reads in blocks of at least 1 MiB, retaining a 15-byte overlap between
/// successive blocks so a sentinel straddling a block boundary is not
/// missed.
pub(crate) fn scan_forward<R: Read + Seek>(r: &mut R) -> std::io::Result<bool> {
    let mut buf = vec![0u8; BLOCK_SIZE + OVERLAP];
    let mut carry: Vec<u8> = Vec::new();
    // Absolute file offset corresponding to buf[carry.len()..]'s first byte,
    // i.e. where the freshly-read portion of this block begins.
    let mut fresh_base = r.stream_position()?;

    loop {
        let carry_len = carry.len();
        buf[..carry_len].copy_from_slice(&carry);
        let read = r.read(&mut buf[carry_len..])?;
        if read == 0 {
            return Ok(false);
        }
        let window = &buf[..carry_len + read];
        if let Some(pos) = find_sentinel(window) {
            // `pos` is an index into `window`, whose byte 0 sits at
            // `fresh_base - carry_len` in the file.
            let sentinel_file_offset = fresh_base - carry_len as u64 + pos as u64;
            r.seek(SeekFrom::Start(sentinel_file_offset + 15))?;
            return Ok(true);
        }
        fresh_base += read as u64;
        let keep = window.len().min(OVERLAP);
        carry = window[window.len() - keep..].to_vec();
    }
}

fn find_sentinel(window: &[u8]) -> Option<usize> {
    window
        .windows(SENTINEL.len())
        .position(|w| w == SENTINEL)
}
