pub mod column;
pub mod flat_spatial_pooler;
pub mod inhibition;
pub mod params;
pub mod spatial_pooler;
pub mod synapses;
pub mod topology;
