//! A `Column` in HTM represents one feature detector or receptive field in the Spatial Pooler.
//!
//! Biological inspiration:
//! Columns in HTM are inspired by cortical mini-columns found in the brain.
//!
//! Meaning in HTM:
//! Each column receives input from a fixed random subset of the input space (its potential pool),
//! computes its overlap score with the current input, and competes with other columns
//! to become active. Over multiple learning iterations, each column adjusts its permanence values
//! to become selective for particular input patterns.
//!
//! The pooler stores column state column-major in flat arrays; `Column` is a borrowed,
//! read-only view that gathers everything known about one column.

use super::synapses::Synapse;

/// Read-only view of a single column of a [`SpatialPooler`](super::spatial_pooler::SpatialPooler).
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    /// The index of the column.
    pub index: usize,

    /// Potential synapses sorted by input index.
    pub synapses: &'a [Synapse],

    /// Connected flag of every potential synapse, parallel to `synapses`.
    pub connected: &'a [bool],

    pub overlap_duty_cycle: f32,
    pub active_duty_cycle: f32,
    pub min_overlap_duty_cycle: f32,
    pub min_active_duty_cycle: f32,
    pub boost_factor: f32,
}

impl Column<'_> {
    /// Input indices of the potential pool.
    pub fn potential_pool(&self) -> impl Iterator<Item = usize> + '_ {
        self.synapses.iter().map(|syn| syn.index)
    }

    /// Permanence towards `input`, zero for inputs outside the potential pool.
    pub fn permanence(&self, input: usize) -> f32 {
        self.synapses
            .binary_search_by_key(&input, |syn| syn.index)
            .map_or(0.0, |position| self.synapses[position].permanence)
    }

    /// Whether the synapse towards `input` is connected.
    pub fn is_connected(&self, input: usize) -> bool {
        self.synapses
            .binary_search_by_key(&input, |syn| syn.index)
            .is_ok_and(|position| self.connected[position])
    }

    pub fn connected_count(&self) -> usize {
        self.connected.iter().filter(|&&connected| connected).count()
    }

    /// Never won an inhibition round while learning.
    pub fn is_virgin(&self) -> bool {
        self.active_duty_cycle == 0.0
    }
}
