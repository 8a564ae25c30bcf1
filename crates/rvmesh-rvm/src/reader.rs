//! Typed record stream over the chunked RVM container.

use std::io::Read;

use tracing::warn;

use rvmesh_model::{Geometry, GeometryType};

use crate::cursor::ByteCursor;
use crate::error::RvmError;
use crate::records::{self, CntbBlock, ColrBlock, HeadBlock, ModlBlock};

/// One decoded record from the body of an RVM file.
#[derive(Debug)]
pub enum Record {
    /// A group begins.
    ContainerBegin(CntbBlock),
    /// The innermost open group ends.
    ContainerEnd,
    /// A color definition; carried through for logging only.
    Color(ColrBlock),
    /// A placed primitive with its opacity in percent.
    Primitive {
        /// The decoded primitive.
        geometry: Geometry,
        /// Opacity in percent, 0..=100.
        opacity: u8,
    },
    /// End of the model stream.
    End,
}

/// Pull-based RVM record reader.
///
/// Owns chunk framing: every chunk header declares the absolute offset its
/// body ends at, and the reader verifies it after each decode. Revision-4
/// group records are known to declare offsets past their body for reasons
/// the format does not document; for those (and for primitives inside them)
/// the reader skips ahead to the declared offset with a warning instead of
/// failing.
pub struct RvmReader<R: Read> {
    cursor: ByteCursor<R>,
    container_versions: Vec<u32>,
}

impl<R: Read> RvmReader<R> {
    /// Creates a reader over a stream of `len` bytes.
    pub fn new(inner: R, len: u64) -> Self {
        RvmReader {
            cursor: ByteCursor::new(inner, len),
            container_versions: Vec::new(),
        }
    }

    /// Absolute offset of the next unread byte.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Bytes left in the stream.
    pub fn remaining(&self) -> u64 {
        self.cursor.remaining()
    }

    /// Restarts the per-root content digest.
    pub fn digest_reset(&mut self) {
        self.cursor.digest_reset();
    }

    /// Hex digest of the bytes consumed since the last reset.
    pub fn digest_hex(&self) -> String {
        self.cursor.digest_hex()
    }

    /// Reads a chunk header, returning the tag and the declared end offset.
    ///
    /// Tags are stored as four u32 words, each holding one ASCII character
    /// in its low byte. The trailing header word has no known meaning.
    fn chunk_header(&mut self) -> Result<(String, u32), RvmError> {
        let mut tag = String::with_capacity(4);
        for _ in 0..4 {
            self.cursor.skip(3)?;
            tag.push(self.cursor.read_u8()? as char);
        }
        let end_offset = self.cursor.read_u32()?;
        self.cursor.read_u32()?;
        Ok((tag, end_offset))
    }

    fn check_framing(&self, tag: &str, expected: u32) -> Result<(), RvmError> {
        let actual = self.cursor.position();
        if actual != expected as u64 {
            return Err(RvmError::FramingMismatch {
                tag: tag.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Skips ahead to `end` when a revision-4 record under-declares its
    /// body. Only applies while the cursor is short of the declared end.
    fn fix_v4_padding(&mut self, tag: &str, end: u32) -> Result<(), RvmError> {
        let pos = self.cursor.position();
        if pos < end as u64 {
            warn!(
                tag,
                at = pos,
                expected = end,
                "revision 4 record shorter than declared, skipping padding"
            );
            self.cursor.skip(end as u64 - pos)?;
        }
        Ok(())
    }

    /// Reads the mandatory HEAD chunk.
    pub fn read_head(&mut self) -> Result<HeadBlock, RvmError> {
        let (tag, end) = self.chunk_header()?;
        if tag != "HEAD" {
            return Err(RvmError::UnexpectedChunk {
                expected: "HEAD",
                found: tag,
            });
        }
        let block = records::head(&mut self.cursor)?;
        self.check_framing("HEAD", end)?;
        Ok(block)
    }

    /// Reads the mandatory MODL chunk.
    pub fn read_modl(&mut self) -> Result<ModlBlock, RvmError> {
        let (tag, end) = self.chunk_header()?;
        if tag != "MODL" {
            return Err(RvmError::UnexpectedChunk {
                expected: "MODL",
                found: tag,
            });
        }
        let block = records::modl(&mut self.cursor)?;
        self.check_framing("MODL", end)?;
        Ok(block)
    }

    /// Reads the next body record.
    pub fn next_record(&mut self) -> Result<Record, RvmError> {
        let header_at = self.cursor.position();
        let (tag, end) = self.chunk_header()?;
        match tag.as_str() {
            "CNTB" => {
                let block = records::cntb(&mut self.cursor)?;
                if block.version == 4 {
                    self.fix_v4_padding("CNTB", end)?;
                }
                self.check_framing("CNTB", end)?;
                self.container_versions.push(block.version);
                Ok(Record::ContainerBegin(block))
            }
            "CNTE" => {
                self.cursor.read_u32()?;
                self.check_framing("CNTE", end)?;
                self.container_versions.pop();
                Ok(Record::ContainerEnd)
            }
            "COLR" => {
                let block = records::colr(&mut self.cursor)?;
                self.check_framing("COLR", end)?;
                Ok(Record::Color(block))
            }
            "PRIM" | "OBST" | "INSU" => {
                let geo_type = match tag.as_str() {
                    "PRIM" => GeometryType::Primitive,
                    "OBST" => GeometryType::Obstruction,
                    _ => GeometryType::Insulation,
                };
                let (geometry, opacity) = records::primitive(&mut self.cursor, geo_type)?;
                if self.container_versions.last() == Some(&4) {
                    self.fix_v4_padding(&tag, end)?;
                }
                self.check_framing(&tag, end)?;
                Ok(Record::Primitive { geometry, opacity })
            }
            "END:" => {
                self.cursor.read_u32()?;
                self.check_framing("END:", end)?;
                Ok(Record::End)
            }
            _ => Err(RvmError::UnknownRecordTag {
                tag,
                at: header_at,
            }),
        }
    }
}
