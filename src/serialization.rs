//! Persistence of whole pooler state.
//!
//! Everything a pooler needs to continue exactly where it stopped is serialized: the synapse
//! arena, duty cycles, boost factors, counters, the inhibition radius, the tie-breakers and the
//! position of the random number generator. Bytes are encoded with bincode.
//!
//! ```rust,ignore
//! use htm_pooler::{Persistable, SpatialPooler};
//!
//! sp.save("pooler.bin")?;
//! let restored = SpatialPooler::load("pooler.bin")?;
//! ```

use crate::core::{flat_spatial_pooler::FlatSpatialPooler, spatial_pooler::SpatialPooler};
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Types whose complete state can be written to and restored from bytes or files.
pub trait Persistable: Serialize + DeserializeOwned + Sized {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).context("failed to serialize state")
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).context("failed to deserialize state")
    }

    /// Writes the state to `path`, replacing any existing file.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)
            .with_context(|| format!("failed to write state to {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", path.display()))
    }

    fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        bincode::deserialize_from(BufReader::new(file))
            .with_context(|| format!("failed to read state from {}", path.display()))
    }
}

impl Persistable for SpatialPooler {}

impl Persistable for FlatSpatialPooler {}
