//! RVM to glTF conversion pipeline.
//!
//! Reads a binary RVM plant model, tessellates its parametric primitives at
//! a configurable tolerance, merges everything of one color into a single
//! mesh batch, and writes one glTF binary per root group plus a JSON status
//! file summarizing the run. [`convert_file`] is the entry point; the
//! stages live in the `rvmesh-rvm`, `rvmesh-tessellate` and `rvmesh-merge`
//! crates.

#![warn(missing_docs)]

mod glb;
mod pipeline;
mod status;

use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use rvmesh_rvm::{HeadBlock, RvmError, RvmReader};

pub use pipeline::{ConvertReport, ModelEntry};
pub use status::{HeaderInfo, Status};

/// Anything that can go wrong during a conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Malformed input file.
    #[error(transparent)]
    Rvm(#[from] RvmError),
    /// Failure serializing the glTF document or the status file.
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    /// A group-end record with no matching group begin.
    #[error("group end without a matching group begin at offset {at}")]
    UnbalancedGroupEnd {
        /// Stream offset of the offending record.
        at: u64,
    },
}

/// Conversion settings. [`ConvertOptions::default`] mirrors the CLI
/// defaults.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Directory the glTF binaries and the status file are written into.
    pub output_dir: PathBuf,
    /// Group nesting depth at which each group becomes its own output file;
    /// 0 exports every top-level group.
    pub export_level: u32,
    /// Drop childless groups without geometry.
    pub remove_empty: bool,
    /// Weld and clean vertex buffers per node.
    pub weld: bool,
    /// Weld quantization, decimal digits.
    pub weld_precision: u8,
    /// Tessellation tolerance in world units.
    pub tolerance: f32,
    /// Target triangle ratio for simplification; 0 disables it.
    pub simplify_ratio: f32,
    /// Simplification error bound in world units; 0 means unbounded.
    pub simplify_target_error: f32,
    /// Run the whole pipeline but write nothing.
    pub dry_run: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            output_dir: PathBuf::from("./exports/"),
            export_level: 0,
            remove_empty: true,
            weld: true,
            weld_precision: 3,
            tolerance: 0.01,
            simplify_ratio: 0.0,
            simplify_target_error: 0.0,
            dry_run: false,
        }
    }
}

/// Converts one RVM file, writing glTF binaries and a `status_file.json`
/// into the output directory. Returns what was exported. On a fatal parse
/// error the status file is still written, carrying the error and whatever
/// was exported up to that point.
pub fn convert_file(input: &Path, opts: &ConvertOptions) -> Result<ConvertReport, ConvertError> {
    let file = File::open(input)?;
    let len = file.metadata()?.len();
    let mut reader = RvmReader::new(file, len);

    let mut head = HeadBlock::default();
    let mut report = ConvertReport::default();
    let result = read_stream(&mut reader, input, opts, &mut head, &mut report);
    if let Err(err) = &result {
        report.warnings.push(err.to_string());
    }

    if !opts.dry_run {
        std::fs::create_dir_all(&opts.output_dir)?;
        let path = opts.output_dir.join("status_file.json");
        status::write_status(&path, &Status::new(&head, &report))?;
    }
    result?;
    Ok(report)
}

fn read_stream<R: std::io::Read>(
    reader: &mut RvmReader<R>,
    input: &Path,
    opts: &ConvertOptions,
    head: &mut HeadBlock,
    report: &mut ConvertReport,
) -> Result<(), ConvertError> {
    *head = reader.read_head()?;
    let modl = reader.read_modl()?;
    info!(
        file = %input.display(),
        project = %modl.project,
        model = %modl.name,
        revision = head.version,
        "converting"
    );
    pipeline::run(reader, opts, report)
}
