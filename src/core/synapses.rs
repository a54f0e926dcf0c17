//! A `Synapse` models a single potential connection between a column and an input bit.
//! Each synapse links exactly one input index to one column.
//!
//! If the permanence is strictly above the connected threshold, the synapse is considered "connected".
//! During learning, permanence is increased or decreased depending on whether the corresponding
//! input bit was active. A connected synapse counts toward the column's overlap score.
//!
//! The centralized `Synapses` struct is an arena that stores the potential synapses of all columns
//! in a single contiguous vec. Each column's synapses occupy a contiguous subrange of this array,
//! sorted by input index, and a parallel mask records which of them are connected.
//! Potential pools never change after construction, so a column's subrange is fixed for its lifetime.
//!
//! This layout keeps the overlap scorer a branch-free walk over one slice per column,
//! avoids a heap object per synapse, and makes the whole pool trivially serializable.
//!
//! Every permanence change goes through [`Synapses::update_column_permanences`], which clips,
//! optionally raises the column to its stimulus threshold, trims tiny values to zero and
//! re-derives the connected mask and count. The mask is never mutated on its own.

use super::params::PermanenceOptions;
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A synapse connecting an input index with an associated permanence value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Synapse {
    /// Points to which input bit this synapse connects to.
    pub index: usize,

    /// Represents the strength of the connection between the column and the input bit.
    pub permanence: f32,
}

/// A flat pool of potential synapses for all columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synapses {
    /// All potential synapses, column after column.
    synapses: Vec<Synapse>,

    /// Whether the synapse at the same position is connected.
    connected: Vec<bool>,

    /// Start of every column's subrange, plus one trailing end offset.
    offsets: Vec<usize>,

    /// The number of connected synapses for each column.
    connected_counts: Vec<usize>,
}

impl Synapses {
    /// Creates an empty synapse pool. Columns are added in order with [`Synapses::init_column`].
    pub fn new(num_columns: usize) -> Self {
        let mut offsets = Vec::with_capacity(num_columns + 1);
        offsets.push(0);
        Self {
            synapses: Vec::new(),
            connected: Vec::new(),
            offsets,
            connected_counts: Vec::with_capacity(num_columns),
        }
    }

    /// Number of columns added so far.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.connected_counts.len()
    }

    /// Appends the next column with the given potential pool and permanences.
    /// The pool is sorted by input index; the connected state is derived without raising.
    pub fn push_column(&mut self, potential: &[usize], permanences: &[f32], options: &PermanenceOptions) {
        debug_assert_eq!(potential.len(), permanences.len());
        let mut column: Vec<Synapse> = potential
            .iter()
            .zip(permanences)
            .map(|(&index, &permanence)| Synapse { index, permanence })
            .collect();
        column.sort_unstable_by_key(|syn| syn.index);
        column.dedup_by_key(|syn| syn.index);

        self.synapses.extend_from_slice(&column);
        self.connected.resize(self.synapses.len(), false);
        self.offsets.push(self.synapses.len());
        self.connected_counts.push(0);

        let column_index = self.num_columns() - 1;
        self.update_column_permanences(column_index, false, 0, options);
    }

    /// Initializes the synapse pool for the next column from the given candidate input indices.
    /// Each synapse starts connected with probability `init_connected_percentage`: connected
    /// permanences lie slightly above the threshold, unconnected ones anywhere below it.
    /// Afterwards the column is raised until `stimulus_threshold` synapses are connected.
    pub fn init_column<R: Rng>(
        &mut self,
        potential: &[usize],
        init_connected_percentage: f32,
        stimulus_threshold: u32,
        options: &PermanenceOptions,
        rng: &mut R,
    ) {
        let permanences: Vec<f32> = potential
            .iter()
            .map(|_| {
                let random = if rng.random::<f32>() <= init_connected_percentage {
                    options.connected + rng.random::<f32>() * options.active_increment / 4.0
                } else {
                    options.connected * rng.random::<f32>()
                };

                let permanence = (random * 100_000.0).trunc() / 100_000.0;
                if permanence < options.trim_threshold {
                    0.0
                } else {
                    permanence
                }
            })
            .collect();

        self.push_column(potential, &permanences, options);
        let column = self.num_columns() - 1;
        self.update_column_permanences(column, true, stimulus_threshold, options);
    }

    /// Settles a column after its permanences changed:
    /// - clamp values to [options.min, options.max],
    /// - if `raise_permanences` is true, raise values until `stimulus_threshold` synapses are connected,
    /// - snap values below the trim threshold to exactly zero,
    /// - finally, re-derive the connected mask and count of the column.
    pub fn update_column_permanences(
        &mut self,
        column: usize,
        raise_permanences: bool,
        stimulus_threshold: u32,
        options: &PermanenceOptions,
    ) {
        for syn in self.column_mut(column) {
            syn.permanence = syn.permanence.clamp(options.min, options.max);
        }

        if raise_permanences {
            self.raise_column_permanences(column, stimulus_threshold, options);
        }

        for syn in self.column_mut(column) {
            if syn.permanence < options.trim_threshold {
                syn.permanence = 0.0;
            }
        }

        let range = self.col_range(column);
        let mut count = 0;
        for (syn, connected) in self.synapses[range.clone()]
            .iter()
            .zip(&mut self.connected[range])
        {
            debug_assert!((options.min..=options.max).contains(&syn.permanence));
            *connected = options.is_connected(syn.permanence);
            count += *connected as usize;
        }
        self.connected_counts[column] = count;
    }

    /// Raises all potential permanences of a column by the below-stimulus increment until at least
    /// `stimulus_threshold` of them are connected. Stops early once a pass no longer moves any
    /// permanence, i.e. every synapse is saturated or the increment is lost to rounding.
    pub fn raise_column_permanences(
        &mut self,
        column: usize,
        stimulus_threshold: u32,
        options: &PermanenceOptions,
    ) {
        let slice = self.column_mut(column);

        while slice
            .iter()
            .filter(|syn| options.is_connected(syn.permanence))
            .count()
            < stimulus_threshold as usize
        {
            let mut moved = false;
            for syn in slice.iter_mut() {
                let raised = (syn.permanence + options.below_stimulus_increment).min(options.max);
                moved |= raised != syn.permanence;
                syn.permanence = raised;
            }
            if !moved {
                warn!(
                    "column {column} cannot reach stimulus threshold {stimulus_threshold} \
                     with {} potential synapses",
                    slice.len()
                );
                return;
            }
        }
    }

    /// Adds `amount` to every potential permanence of a column and settles it without raising.
    pub fn bump_column(&mut self, column: usize, amount: f32, options: &PermanenceOptions) {
        for syn in self.column_mut(column) {
            syn.permanence += amount;
        }
        self.update_column_permanences(column, false, 0, options);
    }

    /// Counts the connected synapses of a column whose input bit is on.
    #[inline]
    pub fn overlap(&self, column: usize, input: &[bool]) -> u32 {
        let range = self.col_range(column);
        self.synapses[range.clone()]
            .iter()
            .zip(&self.connected[range])
            .map(|(syn, &connected)| (connected & input[syn.index]) as u32)
            .sum()
    }

    /// Returns the index range corresponding to the synapses stored for the given column.
    #[inline]
    fn col_range(&self, column: usize) -> Range<usize> {
        self.offsets[column]..self.offsets[column + 1]
    }

    /// Returns an immutable slice for all potential synapses in the given column, sorted by input index.
    #[inline]
    pub fn column(&self, column: usize) -> &[Synapse] {
        &self.synapses[self.col_range(column)]
    }

    /// Returns a mutable slice for all potential synapses in the given column.
    /// Callers must settle the column with [`Synapses::update_column_permanences`] afterwards.
    #[inline]
    pub fn column_mut(&mut self, column: usize) -> &mut [Synapse] {
        let r = self.col_range(column);
        &mut self.synapses[r]
    }

    /// The connected mask of a column, parallel to [`Synapses::column`].
    #[inline]
    pub fn connected_mask(&self, column: usize) -> &[bool] {
        &self.connected[self.col_range(column)]
    }

    /// Input indices of the connected synapses of a column.
    #[inline]
    pub fn connected_inputs(&self, column: usize) -> impl Iterator<Item = usize> + '_ {
        self.column(column)
            .iter()
            .zip(self.connected_mask(column))
            .filter(|(_, &connected)| connected)
            .map(|(syn, _)| syn.index)
    }

    #[inline]
    pub fn connected_count(&self, column: usize) -> usize {
        self.connected_counts[column]
    }

    #[inline]
    pub fn connected_counts(&self) -> &[usize] {
        &self.connected_counts
    }
}
