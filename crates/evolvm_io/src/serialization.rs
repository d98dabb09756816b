//! JSON and HexDNA encodings of genomes and memory spaces.
//!
//! HexDNA is the instruction bytes as lowercase hex, two characters per
//! locus. A memory space appends its flag bytes after a `:` separator so
//! both halves keep the byte-for-byte layout.

use crate::error::{IoError, Result};
use evolvm_data::{Genome, Instruction, LocusFlags, MemorySpace};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

pub fn to_json<T: Serialize>(data: &T) -> Result<String> {
    Ok(serde_json::to_string(data)?)
}

pub fn to_json_pretty<T: Serialize>(data: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

pub fn from_json<T>(json: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if json.trim().is_empty() {
        return Err(IoError::Empty("JSON document"));
    }
    Ok(serde_json::from_str(json)?)
}

/// Rejects a deserialized memory space whose flag array does not match.
pub fn check_memory_space(space: MemorySpace) -> Result<MemorySpace> {
    let (instructions, flags) = (space.instructions().len(), space.flag_slice().len());
    if instructions != flags {
        return Err(IoError::FlagMismatch {
            instructions,
            flags,
        });
    }
    Ok(space)
}

pub fn memory_space_from_json(json: &str) -> Result<MemorySpace> {
    check_memory_space(from_json(json)?)
}

pub fn genome_to_hex(genome: &Genome) -> String {
    genome.to_hex()
}

pub fn genome_from_hex(hex_str: &str) -> Result<Genome> {
    let trimmed = hex_str.trim();
    if trimmed.is_empty() {
        return Err(IoError::Empty("hex genome"));
    }
    let bytes = hex::decode(trimmed)?;
    Ok(Genome::from_bytes(&bytes))
}

pub fn memory_space_to_hex(space: &MemorySpace) -> String {
    let insts: Vec<u8> = space.instructions().iter().map(|i| i.op()).collect();
    let flags: Vec<u8> = space.flag_slice().iter().map(|f| f.bits()).collect();
    format!("{}:{}", hex::encode(insts), hex::encode(flags))
}

pub fn memory_space_from_hex(hex_str: &str) -> Result<MemorySpace> {
    let (insts, flags) = hex_str
        .trim()
        .split_once(':')
        .ok_or_else(|| IoError::malformed("memory space hex lacks the ':' separator"))?;
    let insts = hex::decode(insts)?;
    let flags = hex::decode(flags)?;
    let (instructions, flag_count) = (insts.len(), flags.len());
    MemorySpace::from_parts(
        insts.into_iter().map(Instruction).collect(),
        flags.into_iter().map(LocusFlags).collect(),
    )
    .ok_or(IoError::FlagMismatch {
        instructions,
        flags: flag_count,
    })
}

/// Whether `hex_str` decodes as a genome.
pub fn is_valid_hex_genome(hex_str: &str) -> bool {
    let trimmed = hex_str.trim();
    !trimmed.is_empty() && hex::decode(trimmed).is_ok()
}

/// SHA-256 of the instruction bytes; equal genomes share a digest.
pub fn genome_digest(genome: &Genome) -> String {
    let mut hasher = Sha256::new();
    hasher.update(genome.to_bytes());
    hex::encode(hasher.finalize())
}

pub fn write_json_file<T, P>(data: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json = to_json_pretty(data)?;
    std::fs::write(&path, json).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("writing JSON to {}", path.as_ref().display()))
    })
}

pub fn read_json_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let json = std::fs::read_to_string(&path)
        .map_err(|e| IoError::reading(e, "JSON", path.as_ref()))?;
    from_json(&json)
}
