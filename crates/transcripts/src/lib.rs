//! `scribehub-transcripts` — transcript resources.
//!
//! Transcripts, the transcript type catalog, and playlists. Every operation
//! follows the same template: validate the payload, stamp the tenant, run
//! sequential foreign-entity checks, execute a tenant-scoped query.

pub mod playlist;
pub mod transcript;
pub mod transcript_type;

pub use playlist::{Playlist, PlaylistService};
pub use transcript::{
    SourceKind, Transcript, TranscriptFilter, TranscriptService, TranscriptStatus,
};
pub use transcript_type::{TranscriptType, TranscriptTypeService};
