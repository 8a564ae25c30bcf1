//! Conversion status file.
//!
//! One JSON file per converted input, listing the exported models with their
//! content digests, any warnings, and the source file's header. Downstream
//! tooling uses the digests to skip re-imports of unchanged roots.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use rvmesh_rvm::HeadBlock;

use crate::pipeline::{ConvertReport, ModelEntry};
use crate::ConvertError;

/// Header fields carried over from the source file.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderInfo {
    /// Export date.
    pub date: String,
    /// Text encoding name.
    pub encoding: String,
    /// Exporting application banner.
    pub info: String,
    /// Free-form note.
    pub note: String,
    /// Exporting user.
    pub user: String,
    /// Format revision.
    pub version: u32,
}

/// The full status document.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    /// Exported models, in file order.
    pub models: Vec<ModelEntry>,
    /// Non-fatal problems encountered during conversion.
    pub warnings: Vec<String>,
    /// Source file header.
    pub header: HeaderInfo,
}

impl Status {
    /// Builds the document from the file header and the conversion outcome.
    pub fn new(head: &HeadBlock, report: &ConvertReport) -> Self {
        Status {
            models: report.models.clone(),
            warnings: report.warnings.clone(),
            header: HeaderInfo {
                date: head.date.clone(),
                encoding: head.encoding.clone(),
                info: head.info.clone(),
                note: head.note.clone(),
                user: head.user.clone(),
                version: head.version,
            },
        }
    }
}

/// Writes the status document as pretty-printed JSON.
pub fn write_status(path: &Path, status: &Status) -> Result<(), ConvertError> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, status)?;
    Ok(())
}
