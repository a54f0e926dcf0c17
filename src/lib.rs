//! Spatial Pooler for Hierarchical Temporal Memory (HTM).
//!
//! The Spatial Pooler turns a dense binary input vector into a fixed-sparsity set of active
//! columns (an SDR) and keeps adapting the connectivity of every column while it runs.
//! Two compositions are provided:
//! - [`SpatialPooler`]: boosted-overlap competition with global or local (topological) inhibition.
//! - [`FlatSpatialPooler`]: a global, 1-D pooler that always lets never-trained ("virgin") and
//!   near-perfectly matching columns win.

pub mod core;
pub mod error;
pub mod serialization;

pub use crate::core::{
    flat_spatial_pooler::{FlatSpatialPooler, FlatSpatialPoolerParams},
    params::{InhibitionDensity, PermanenceOptions, SpatialPoolerParams},
    spatial_pooler::SpatialPooler,
};
pub use error::{Error, Result};
pub use serialization::Persistable;
