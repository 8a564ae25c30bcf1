//! Error types for RVM reading.

use thiserror::Error;

/// Errors produced while decoding an RVM file.
#[derive(Debug, Error)]
pub enum RvmError {
    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The file ended in the middle of a record.
    #[error("input truncated at byte {at}")]
    TruncatedInput {
        /// Byte offset where more data was expected.
        at: u64,
    },

    /// A record did not end at the offset declared in its chunk header.
    #[error("{tag} record framing mismatch: header declares end at {expected}, cursor at {actual}")]
    FramingMismatch {
        /// Tag of the offending record.
        tag: String,
        /// End offset declared by the chunk header.
        expected: u32,
        /// Actual cursor position after decoding the record body.
        actual: u64,
    },

    /// A chunk tag outside the known vocabulary.
    #[error("unknown record tag {tag:?} at byte {at}")]
    UnknownRecordTag {
        /// The four tag characters as read.
        tag: String,
        /// Byte offset of the chunk header.
        at: u64,
    },

    /// A primitive record with a kind outside 1..=11.
    #[error("unknown primitive kind {kind} at byte {at}")]
    UnknownPrimitiveKind {
        /// The kind discriminant as read.
        kind: u32,
        /// Byte offset where the kind was read.
        at: u64,
    },

    /// A mandatory chunk was missing or out of order.
    #[error("expected {expected} chunk, found {found:?}")]
    UnexpectedChunk {
        /// The tag that was required here.
        expected: &'static str,
        /// The tag actually read.
        found: String,
    },
}
