//! Reader for the binary RVM plant model format.
//!
//! RVM files are chunked: each record starts with a 24-byte header holding a
//! four-character tag (one ASCII character per u32 word), the absolute byte
//! offset the record body ends at, and one undocumented word. A file is
//! `HEAD`, `MODL`, then a stream of group (`CNTB`/`CNTE`), color (`COLR`)
//! and primitive (`PRIM`/`OBST`/`INSU`) records, terminated by `END:`.
//! All values are big-endian.
//!
//! [`RvmReader`] turns that stream into typed [`Record`]s, validating record
//! framing against the declared end offsets and working around the padding
//! quirk of revision-4 group records.

#![warn(missing_docs)]

mod cursor;
mod error;
mod reader;
mod records;

pub use cursor::ByteCursor;
pub use error::RvmError;
pub use reader::{Record, RvmReader};
pub use records::{CntbBlock, ColrBlock, HeadBlock, ModlBlock};
