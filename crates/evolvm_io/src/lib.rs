//! # evolvm io
//!
//! Genome import and export.
//!
//! This crate provides:
//! - Structured error handling with [`IoError`]
//! - JSON and HexDNA encodings that keep instruction bytes and locus flags
//! - Validated rkyv archives
//! - The `.org` instruction-name listing

/// Validated rkyv archives of genomes and memory spaces
pub mod archive;
/// Error types and result aliases for I/O operations
pub mod error;
/// The `.org` one-name-per-line genome listing
pub mod org_format;
/// JSON and HexDNA helpers
pub mod serialization;

pub use archive::{from_rkyv_bytes, load_genome, save_genome, to_rkyv_bytes};
pub use error::{IoError, Result};
pub use org_format::{format_org, parse_org, read_org_file, write_org_file};
pub use serialization::{
    from_json, genome_digest, genome_from_hex, genome_to_hex, is_valid_hex_genome,
    memory_space_from_hex, memory_space_from_json, memory_space_to_hex, read_json_file, to_json,
    to_json_pretty, write_json_file,
};
