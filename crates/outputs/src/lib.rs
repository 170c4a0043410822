//! `scribehub-outputs` — derivative output resources.
//!
//! Output types (what can be generated from a transcript) and output files
//! (one generated artifact, referencing a transcript and an output type).

pub mod output_file;
pub mod output_type;

pub use output_file::{OutputFile, OutputFileService, OutputFileStatus};
pub use output_type::{OutputFormat, OutputType, OutputTypeService};
