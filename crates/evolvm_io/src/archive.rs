//! rkyv archives of genomes and memory spaces.
//!
//! Archives are validated with `check_archived_root` before anything is
//! deserialized, so a truncated or foreign file is an error, never UB.

use crate::error::{IoError, Result};
use crate::serialization::check_memory_space;
use evolvm_data::{Genome, MemorySpace};
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{Archive, CheckBytes, Deserialize, Serialize};
use std::path::Path;

pub fn to_rkyv_bytes<T>(data: &T) -> Result<Vec<u8>>
where
    T: Archive + Serialize<AllocSerializer<1024>>,
{
    let mut serializer = AllocSerializer::<1024>::default();
    serializer
        .serialize_value(data)
        .map_err(|e| IoError::archive(format!("serialization failed: {e:?}")))?;
    Ok(serializer.into_serializer().into_inner().to_vec())
}

pub fn from_rkyv_bytes<T>(bytes: &[u8]) -> Result<T>
where
    T: Archive,
    T::Archived: Deserialize<T, SharedDeserializeMap> + for<'a> CheckBytes<DefaultValidator<'a>>,
{
    if bytes.is_empty() {
        return Err(IoError::Empty("archive"));
    }
    // Archives are read from arbitrary offsets; copy into aligned storage.
    let mut aligned = rkyv::AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);
    let archived = rkyv::check_archived_root::<T>(&aligned)
        .map_err(|e| IoError::archive(format!("validation failed: {e:?}")))?;
    let mut deserializer = SharedDeserializeMap::default();
    archived
        .deserialize(&mut deserializer)
        .map_err(|e| IoError::archive(format!("deserialization failed: {e:?}")))
}

pub fn save_genome<P: AsRef<Path>>(genome: &Genome, path: P) -> Result<()> {
    let bytes = to_rkyv_bytes(genome)?;
    std::fs::write(&path, bytes).map_err(|e| {
        IoError::FileSystem(e)
            .with_context(format!("writing archive {}", path.as_ref().display()))
    })
}

pub fn load_genome<P: AsRef<Path>>(path: P) -> Result<Genome> {
    from_rkyv_bytes(&read(path.as_ref())?)
}

pub fn save_memory_space<P: AsRef<Path>>(space: &MemorySpace, path: P) -> Result<()> {
    let bytes = to_rkyv_bytes(space)?;
    std::fs::write(&path, bytes).map_err(|e| {
        IoError::FileSystem(e)
            .with_context(format!("writing archive {}", path.as_ref().display()))
    })
}

pub fn load_memory_space<P: AsRef<Path>>(path: P) -> Result<MemorySpace> {
    check_memory_space(from_rkyv_bytes(&read(path.as_ref())?)?)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| IoError::reading(e, "archive", path))
}
