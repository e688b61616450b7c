//! Errors returned by this crate.

use std::io;

/// Set of errors that can surface to a caller of [`crate::load`].
///
/// Most decode-time faults (a bad varint, an inconsistent chunk length, a
/// malformed sample) are recovered internally by resynchronizing on the
/// next boundary chunk rather than being returned here; see the crate-level
/// docs for the recovery policy. Only faults that make the whole file
/// unreadable propagate.
#[derive(Debug, thiserror::Error)]
pub enum XdfError {
    /// The given path does not exist or could not be opened.
    #[error("file not found: {0}")]
    FileNotFound(#[source] io::Error),

    /// The first four bytes of the file were not `XDF:`.
    #[error("not a valid XDF file: bad magic")]
    BadMagic,

    /// The reader had fewer than 4 bytes available, so the magic prefix
    /// could not even be checked.
    #[error("unexpected end of file")]
    UnexpectedEof,

    /// A variable-length integer's length prefix was not one of `{1, 4, 8}`.
    #[error("malformed variable-length integer: length prefix {0}")]
    MalformedVarInt(u8),

    /// A `StreamHeader`'s `channel_format` was not a recognized value.
    #[error("unknown channel format: {0:?}")]
    UnknownChannelFormat(String),

    /// A chunk's payload did not match its declared length.
    #[error("chunk payload length mismatch: declared {declared}, read {read}")]
    InconsistentChunk {
        /// Length declared by the chunk header.
        declared: u64,
        /// Length actually available/consumed.
        read: u64,
    },

    /// Decoding a `Samples` chunk failed partway through.
    #[error("failed to decode samples chunk: {0}")]
    DecodeFailure(String),

    /// The file had a valid magic but contained no recognizable chunk.
    #[error("no recognizable chunk found in file")]
    Empty,

    /// Underlying I/O failure not covered by a more specific variant above.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A fault local to decoding the current chunk. Never escapes the crate;
/// the chunk driver logs it and resynchronizes on the next boundary chunk.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ChunkFault {
    #[error("malformed varint")]
    MalformedVarInt(u8),
    #[error("unknown channel format: {0}")]
    UnknownChannelFormat(String),
    #[error("chunk payload length mismatch: declared {declared}, read {read}")]
    InconsistentChunk { declared: u64, read: u64 },
    #[error("sample decode failure: {0}")]
    DecodeFailure(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}
