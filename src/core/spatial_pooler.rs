//! The `SpatialPooler` is a core component of HTM that:
//! - Initializes and maintains a set of columns, each with potential synapses into its own subset of the input space.
//! - Learns to increase/decrease synapse permanence (strength) values if the connected input bit was active/inactive.
//! - Computes an "overlap" score for each column based on how many connected synapses match the current input.
//! - Enforces sparse activity via inhibition, allowing only a subset of top columns to become "active columns".
//!
//! Each column selectively "tunes" its connections to represent frequently encountered input patterns, leading to SDRs.
//!
//! What are duty cycles?
//! - They are rolling metrics that measure how often each column is meeting certain criteria over time.
//! - The SP tracks: overlap duty cycles (ODC) and active duty cycles (ADC).
//! - ODC tracks how frequently a column has a non-zero overlap score with the input.
//! - ADC tracks how frequently a column is chosen as a winner after inhibition.
//! - Columns whose ODC falls below a floor get all their permanences bumped up.
//! - Columns whose ADC falls below a floor get their overlap boosted before inhibition.
//! - This prevents columns from becoming inactive or uncompetitive over time.
//!
//! A `compute` call is one synchronous transaction over the pooler's state. With `learn == false`
//! nothing but the iteration counter and the scratch buffers of the call changes.

use super::{
    column::Column,
    inhibition::{inhibit_columns_global, inhibit_columns_local},
    params::{InhibitionDensity, PermanenceOptions, SpatialPoolerParams},
    synapses::Synapses,
    topology::Topology,
};
use crate::error::{Error, Result};
use log::{debug, trace};
use rand::{seq::IteratorRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// The SpatialPooler manages a set of columns that compete to represent the input space.
/// It computes overlaps, applies inhibition, boosts weak columns, and adapts synapses during learning.
/// Synapse management is performed via the embedded `Synapses` pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialPooler {
    /// A seeded pseudo-random number generator for reproducible randomness (e.g., synapse initialization).
    rand: ChaCha8Rng,

    /// The total number of compute iterations performed so far (whether learning or not).
    iteration_num: u64,

    /// The number of compute iterations performed so far with learning enabled.
    iteration_learn_num: u64,

    /// Defines the radius (in input-space) around a column's center from which potential synapses can be drawn.
    potential_radius: usize,

    /// Controls how many input bits within the `potential_radius` become potential synapses for each column.
    potential_percentage: f32,

    /// If true, every column competes with every other column.
    global_inhibition: bool,

    /// How the target density of active columns is derived.
    inhibition_density: InhibitionDensity,

    /// Overlaps below this value are zeroed before inhibition.
    stimulus_threshold: u32,

    /// Fraction of the maximum overlap duty cycle used as a threshold for deciding if a column's overlap duty cycle is too low.
    min_percentage_overlap_duty_cycles: f32,

    /// Fraction of the maximum active duty cycle used as a threshold for deciding if a column's active duty cycle is too low.
    min_percentage_active_duty_cycles: f32,

    /// The time window over which overlap and active duty cycles are updated. Smoothens out fluctuations.
    duty_cycle_period: u32,

    /// The maximum possible boost factor that can be applied to a column's overlap if it is underactive.
    max_boost: f32,

    /// If true, neighborhoods "wrap around" the edges in topology calculations. The space behaves like a torus.
    wrap_around: bool,

    /// The total number of bits/inputs available.
    num_inputs: usize,

    /// The total number of columns in the Spatial Pooler.
    num_columns: usize,

    /// Settings for how synapse permanence is incremented/decremented and thresholds for trimming or connecting.
    synapse_permanence_options: PermanenceOptions,

    /// Fraction of each column's synapses that initially start out above the "connected" threshold.
    init_connected_percentage: f32,

    /// How often (in iterations) certain recalculations happen, like updating inhibition radius or min duty cycles.
    update_period: u32,

    /// Maps 1D column indices to the nD column space.
    column_topology: Topology,

    /// Maps 1D input indices to the nD input space.
    input_topology: Topology,

    /// A pool managing all synapse data. Stores a contiguous block of synapses for every column in one big array.
    synapses: Synapses,

    /// Rolling average of how often each column has an overlap > 0.
    overlap_duty_cycles: Vec<f32>,

    /// Rolling average of how often each column is chosen as a winner. Used to identify columns that never get activated.
    active_duty_cycles: Vec<f32>,

    /// The threshold for each column's overlap duty cycle, columns below this threshold are permanence-bumped.
    min_overlap_duty_cycles: Vec<f32>,

    /// The threshold for each column's active duty cycle, columns below this threshold are overlap-boosted.
    min_active_duty_cycles: Vec<f32>,

    /// A multiplier applied to a column's overlap while learning, in `[1, max_boost]`.
    boost_factors: Vec<f32>,

    /// Fixed per-column offsets in `[0, 0.01)` added to positive scores so that equal scores never tie.
    tie_breaker: Vec<f32>,

    /// Neighborhood radius (in column space) of local inhibition. Set to the largest column dimension under global inhibition.
    inhibition_radius: usize,

    /// How many connected synapses map to active input bits for each column, after the stimulus threshold.
    overlaps: Vec<u32>,

    /// Overlaps multiplied by the boost factors (when learning). These are the inhibition scores.
    boosted_overlaps: Vec<f32>,

    /// The indices of columns that won the inhibition process this iteration, sorted ascending.
    active_columns: Vec<usize>,
}

impl SpatialPooler {
    /// Creates and initializes a new `SpatialPooler`:
    /// - Validates all parameters.
    /// - Draws every column's potential pool and initial permanences from the seeded generator.
    /// - Derives the initial inhibition radius from the resulting connectivity.
    pub fn new(params: SpatialPoolerParams) -> Result<Self> {
        let inhibition_density = params.validate()?;
        let num_columns = params.num_columns();
        let num_inputs = params.num_inputs();

        let mut sp = Self {
            rand: ChaCha8Rng::seed_from_u64(params.seed),
            iteration_num: 0,
            iteration_learn_num: 0,
            potential_radius: params.potential_radius.min(num_inputs),
            potential_percentage: params.potential_pct,
            global_inhibition: params.global_inhibition,
            inhibition_density,
            stimulus_threshold: params.stimulus_threshold,
            min_percentage_overlap_duty_cycles: params.min_pct_overlap_duty_cycle,
            min_percentage_active_duty_cycles: params.min_pct_active_duty_cycle,
            duty_cycle_period: params.duty_cycle_period,
            max_boost: params.max_boost,
            wrap_around: params.wrap_around,
            num_inputs,
            num_columns,
            synapse_permanence_options: params.permanence_options(),
            init_connected_percentage: params.init_connected_pct,
            update_period: params.update_period,
            column_topology: Topology::new(&params.column_dimensions),
            input_topology: Topology::new(&params.input_dimensions),
            synapses: Synapses::new(num_columns),
            overlap_duty_cycles: vec![0.0; num_columns],
            active_duty_cycles: vec![0.0; num_columns],
            min_overlap_duty_cycles: vec![0.0; num_columns],
            min_active_duty_cycles: vec![0.0; num_columns],
            boost_factors: vec![1.0; num_columns],
            tie_breaker: Vec::with_capacity(num_columns),
            inhibition_radius: 0,
            overlaps: vec![0; num_columns],
            boosted_overlaps: vec![0.0; num_columns],
            active_columns: Vec::with_capacity(num_columns),
        };

        sp.connect_and_configure_inputs();
        sp.tie_breaker = (0..num_columns)
            .map(|_| 0.01 * sp.rand.random::<f32>())
            .collect();
        sp.update_inhibition_radius();

        debug!(
            "spatial pooler: inputs={:?} columns={:?} potential_radius={} potential_pct={} \
             global_inhibition={} density={:?} stimulus_threshold={} perm={:?} \
             min_pct_duty=({}, {}) duty_cycle_period={} max_boost={} inhibition_radius={}",
            params.input_dimensions,
            params.column_dimensions,
            sp.potential_radius,
            sp.potential_percentage,
            sp.global_inhibition,
            sp.inhibition_density,
            sp.stimulus_threshold,
            sp.synapse_permanence_options,
            sp.min_percentage_overlap_duty_cycles,
            sp.min_percentage_active_duty_cycles,
            sp.duty_cycle_period,
            sp.max_boost,
            sp.inhibition_radius,
        );

        Ok(sp)
    }

    /// Processes the current `input_pattern` and returns the active columns (sorted):
    /// - Updates iteration counters.
    /// - Calculates overlaps between columns and input subsets.
    /// - Applies boosting if learning is enabled.
    /// - Performs inhibition to pick the active columns.
    ///
    /// If learning is enabled:
    /// - Updates synapse permanence values of the active columns.
    /// - Updates duty cycles, bumps weak columns and recomputes boost factors.
    /// - Periodically recomputes the inhibition radius and the min duty cycles.
    pub fn compute(&mut self, input_pattern: &[bool], learn: bool) -> Result<Vec<usize>> {
        self.begin_compute(input_pattern, learn)?;
        self.inhibit_columns();
        if learn {
            self.learn(input_pattern);
        }
        Ok(self.active_columns.clone())
    }

    /// Validates the input, then computes overlaps and inhibition scores for this iteration.
    pub(crate) fn begin_compute(&mut self, input_pattern: &[bool], learn: bool) -> Result<()> {
        if input_pattern.len() != self.num_inputs {
            return Err(Error::InputSizeMismatch {
                expected: self.num_inputs,
                actual: input_pattern.len(),
            });
        }
        self.update_iteration_number(learn);
        self.calculate_overlaps(input_pattern);
        self.boost(learn);
        Ok(())
    }

    /// The learning half of `compute`. Runs on the settled overlaps and active columns of this iteration.
    pub(crate) fn learn(&mut self, input_pattern: &[bool]) {
        self.adapt_synapses(input_pattern);
        self.update_duty_cycles();
        self.bump_up_weak_columns();
        self.update_boost_factors();
        if self.is_update_round() {
            self.update_inhibition_radius();
            self.update_min_duty_cycles();
            trace!(
                "update round at iteration {}: inhibition_radius={} max_min_active_duty_cycle={}",
                self.iteration_num,
                self.inhibition_radius,
                self.min_active_duty_cycles
                    .iter()
                    .fold(0.0_f32, |acc, &x| acc.max(x)),
            );
        }
    }

    /// Increments the global iteration counters, including a separate counter if `learn` is true.
    #[inline]
    fn update_iteration_number(&mut self, learn: bool) {
        self.iteration_num += 1;
        if learn {
            self.iteration_learn_num += 1;
        }
    }

    /// Calculates the overlap for each column with the current input:
    /// - Counts how many connected synapses map to an active input bit.
    /// - Zeroes every overlap below the stimulus threshold.
    #[inline]
    fn calculate_overlaps(&mut self, input_pattern: &[bool]) {
        let threshold = self.stimulus_threshold;
        let synapses = &self.synapses;
        self.overlaps
            .iter_mut()
            .enumerate()
            .for_each(|(col, overlap)| {
                let count = synapses.overlap(col, input_pattern);
                *overlap = if count < threshold { 0 } else { count };
            });
    }

    /// Multiplies each column's overlap by its boost factor (if learning is on).
    #[inline]
    fn boost(&mut self, learn: bool) {
        for ((boosted, &overlap), &boost) in self
            .boosted_overlaps
            .iter_mut()
            .zip(&self.overlaps)
            .zip(&self.boost_factors)
        {
            *boosted = if learn {
                overlap as f32 * boost
            } else {
                overlap as f32
            };
        }
    }

    /// Fraction of each column's connected synapses that overlap the current input.
    /// Columns without connected synapses report zero.
    pub fn overlap_percentages(&self) -> Vec<f32> {
        self.overlaps
            .iter()
            .zip(self.synapses.connected_counts())
            .map(|(&overlap, &connected)| {
                if connected == 0 {
                    0.0
                } else {
                    overlap as f32 / connected as f32
                }
            })
            .collect()
    }

    /// Target density of active columns for the current inhibition radius.
    pub fn density(&self) -> f32 {
        let diameter = 2 * self.inhibition_radius + 1;
        let inhibition_area = diameter.saturating_pow(self.column_topology.dimensions().len() as u32);
        self.inhibition_density
            .density(inhibition_area, self.num_columns)
    }

    /// Global inhibition applies when configured, or when the inhibition radius spans the whole column space.
    #[inline]
    pub fn uses_global_inhibition(&self) -> bool {
        self.global_inhibition || self.inhibition_radius >= self.column_topology.max_dimension()
    }

    /// Selects the active columns from the boosted overlaps:
    /// - Adds each column's fixed tie-breaker to its positive scores.
    /// - Picks winners globally or within each column's inhibition neighborhood.
    pub(crate) fn inhibit_columns(&mut self) {
        let density = self.density();
        let scores: Vec<f32> = self
            .boosted_overlaps
            .iter()
            .zip(&self.tie_breaker)
            .map(|(&score, &tie)| if score > 0.0 { score + tie } else { 0.0 })
            .collect();

        self.active_columns = if self.uses_global_inhibition() {
            inhibit_columns_global(&scores, density)
        } else {
            inhibit_columns_local(
                &scores,
                density,
                &self.column_topology,
                self.inhibition_radius,
                self.wrap_around,
            )
        };
    }

    /// Adjusts synapses for each active column after an input is processed:
    /// - Increments permanence of synapses whose input bit was active.
    /// - Decrements permanence of synapses whose input bit was inactive.
    /// - Settles the column: clipping, raising to the stimulus threshold, trimming, connected state.
    ///
    /// Implements Hebbian-like learning that shapes columns towards frequently active inputs.
    #[inline]
    fn adapt_synapses(&mut self, input_pattern: &[bool]) {
        let options = self.synapse_permanence_options;
        for &col in &self.active_columns {
            for syn in self.synapses.column_mut(col) {
                if input_pattern[syn.index] {
                    syn.permanence += options.active_increment;
                } else {
                    syn.permanence -= options.inactive_decrement;
                }
            }
            self.synapses
                .update_column_permanences(col, true, self.stimulus_threshold, &options);
        }
    }

    /// Updates the rolling duty cycles for overlap and active states.
    ///
    /// The averaging period grows with the iteration count until it reaches `duty_cycle_period`,
    /// so early iterations are not swamped towards zero.
    #[inline]
    fn update_duty_cycles(&mut self) {
        let period = self.iteration_num.min(u64::from(self.duty_cycle_period)).max(1) as f32;

        let overlapped: Vec<bool> = self.overlaps.iter().map(|&overlap| overlap > 0).collect();
        let mut active = vec![false; self.num_columns];
        for &col in &self.active_columns {
            active[col] = true;
        }

        update_duty_cycles_helper(&mut self.overlap_duty_cycles, &overlapped, period);
        update_duty_cycles_helper(&mut self.active_duty_cycles, &active, period);
    }

    /// Increases permanence on "weak" columns that have low overlap duty cycles:
    /// - For each column whose overlap duty cycle is below its floor, bumps all its potential synapses.
    ///
    /// Prevents columns from perpetually remaining low-overlap, giving them a chance to learn and stay relevant.
    #[inline]
    fn bump_up_weak_columns(&mut self) {
        let options = self.synapse_permanence_options;
        for col in 0..self.num_columns {
            if self.overlap_duty_cycles[col] < self.min_overlap_duty_cycles[col] {
                self.synapses
                    .bump_column(col, options.below_stimulus_increment, &options);
            }
        }
    }

    /// Recalculates each column's boost factor based on its active duty cycle:
    /// - `max_boost` when the column was never active, 1.0 once it reaches its floor.
    /// - Linearly interpolated in between.
    /// - Columns without a floor yet keep a neutral boost of 1.0.
    #[inline]
    fn update_boost_factors(&mut self) {
        let max_boost = self.max_boost;
        self.boost_factors
            .iter_mut()
            .zip(&self.min_active_duty_cycles)
            .zip(&self.active_duty_cycles)
            .for_each(|((boost, &min), &active)| {
                *boost = if min <= 0.0 || active >= min {
                    1.0
                } else {
                    (((1.0 - max_boost) / min) * active + max_boost).clamp(1.0, max_boost)
                };
            });
    }

    /// Updates the minimum duty cycles, globally or within each column's inhibition neighborhood.
    fn update_min_duty_cycles(&mut self) {
        if self.uses_global_inhibition() {
            self.update_min_duty_cycles_global();
        } else {
            self.update_min_duty_cycles_local();
        }
    }

    /// Sets each column's minimum duty cycles to a fraction of the maximum over all columns.
    fn update_min_duty_cycles_global(&mut self) {
        let max_overlap = self
            .overlap_duty_cycles
            .iter()
            .fold(0.0_f32, |acc, &x| acc.max(x));
        let max_active = self
            .active_duty_cycles
            .iter()
            .fold(0.0_f32, |acc, &x| acc.max(x));
        self.min_overlap_duty_cycles
            .fill(self.min_percentage_overlap_duty_cycles * max_overlap);
        self.min_active_duty_cycles
            .fill(self.min_percentage_active_duty_cycles * max_active);
    }

    /// Sets each column's minimum duty cycles to a fraction of the maximum within its neighborhood (itself included).
    fn update_min_duty_cycles_local(&mut self) {
        for col in 0..self.num_columns {
            let (max_overlap, max_active) = self
                .column_topology
                .neighborhood(col, self.inhibition_radius, self.wrap_around)
                .fold((0.0_f32, 0.0_f32), |(overlap, active), neighbor| {
                    (
                        overlap.max(self.overlap_duty_cycles[neighbor]),
                        active.max(self.active_duty_cycles[neighbor]),
                    )
                });
            self.min_overlap_duty_cycles[col] = self.min_percentage_overlap_duty_cycles * max_overlap;
            self.min_active_duty_cycles[col] = self.min_percentage_active_duty_cycles * max_active;
        }
    }

    /// Recomputes the inhibition radius from the average span of the columns' connected synapses,
    /// scaled into column space. Under global inhibition the radius covers the whole column space.
    fn update_inhibition_radius(&mut self) {
        if self.global_inhibition {
            self.inhibition_radius = self.column_topology.max_dimension();
            return;
        }

        let total_span: f32 = (0..self.num_columns)
            .map(|col| self.avg_connected_span_for_column(col))
            .sum();
        let avg_connected_span = total_span / self.num_columns as f32;
        self.inhibition_radius =
            inhibition_radius_for(avg_connected_span, self.avg_columns_per_input());
    }

    /// Average (over input dimensions) extent of a column's connected synapses. Zero without connected synapses.
    fn avg_connected_span_for_column(&self, column: usize) -> f32 {
        let num_dims = self.input_topology.dimensions().len();
        let mut min_coords = vec![usize::MAX; num_dims];
        let mut max_coords = vec![0; num_dims];
        let mut any = false;

        for input in self.synapses.connected_inputs(column) {
            any = true;
            for (dim, coord) in self.input_topology.coordinates(input).into_iter().enumerate() {
                min_coords[dim] = min_coords[dim].min(coord);
                max_coords[dim] = max_coords[dim].max(coord);
            }
        }

        if !any {
            return 0.0;
        }

        let total: usize = min_coords
            .iter()
            .zip(&max_coords)
            .map(|(&min, &max)| max - min + 1)
            .sum();
        total as f32 / num_dims as f32
    }

    /// Average ratio of column-space size to input-space size over all dimensions.
    fn avg_columns_per_input(&self) -> f32 {
        let ratios: f32 = self
            .column_topology
            .dimensions()
            .iter()
            .zip(self.input_topology.dimensions())
            .map(|(&col_dim, &in_dim)| col_dim as f32 / in_dim as f32)
            .sum();
        ratios / self.column_topology.dimensions().len() as f32
    }

    #[inline]
    fn is_update_round(&self) -> bool {
        self.iteration_num % u64::from(self.update_period) == 0
    }

    /// Allocates and configures each column's synapses by sampling input bits within the potential radius:
    /// - Calls `map_potential()` for each column to select which input indices are in that column's potential pool.
    /// - Initializes each column's synapses with random permanence values based on `init_connected_percentage`.
    ///
    /// Establishes each column's initial "potential synapses," which define where it can learn to connect.
    fn connect_and_configure_inputs(&mut self) {
        for column in 0..self.num_columns {
            let potential = self.map_potential(column);
            self.synapses.init_column(
                &potential,
                self.init_connected_percentage,
                self.stimulus_threshold,
                &self.synapse_permanence_options,
                &mut self.rand,
            );
        }
    }

    /// Samples which input bits fall within a column's potential radius, optionally wrapping around:
    /// - Determines the center input index for the column via `map_column()`.
    /// - Gathers all input indices within the potential radius from that center.
    /// - Randomly selects `potential_percentage` fraction of them as potential synapses.
    ///
    /// Returns the sorted input indices of the potential pool.
    fn map_potential(&mut self, column: usize) -> Vec<usize> {
        let center = self.map_column(column);
        let candidates: Vec<usize> = self
            .input_topology
            .neighborhood(center, self.potential_radius, self.wrap_around)
            .collect();
        let size = self.potential_synapses(candidates.len());
        let mut sample = candidates.into_iter().choose_multiple(&mut self.rand, size);
        sample.sort_unstable();
        sample
    }

    /// Calculates how many potential synapses a column should have, given the potential radius neighborhood size.
    #[inline]
    fn potential_synapses(&self, input_size: usize) -> usize {
        ((input_size as f32 * self.potential_percentage) + 0.5) as usize
    }

    /// Maps a column index to the "center" input index in the input space:
    /// - Proportionally maps the column's coordinates to the input grid coordinates.
    /// - Offset by half a cell for better distribution.
    /// - Clamps the result to the valid input range.
    fn map_column(&self, column: usize) -> usize {
        let coords: Vec<usize> = self
            .column_topology
            .coordinates(column)
            .into_iter()
            .zip(self.column_topology.dimensions())
            .zip(self.input_topology.dimensions())
            .map(|((index, &col_dim), &in_dim)| {
                let new_index = ((index as f32 / col_dim as f32) * in_dim as f32
                    + (in_dim as f32 / col_dim as f32) * 0.5) as usize;
                new_index.min(in_dim - 1)
            })
            .collect();
        self.input_topology.index_from_coordinates(&coords)
    }

    /// Removes columns that have never been active while learning from `active_columns`.
    ///
    /// Useful at inference time, where a column that never learned anything carries no meaning.
    pub fn strip_unlearned_columns(&self, active_columns: &[usize]) -> Vec<usize> {
        active_columns
            .iter()
            .copied()
            .filter(|&col| self.active_duty_cycles[col] > 0.0)
            .collect()
    }

    #[inline]
    fn check_column(&self, column: usize) -> Result<()> {
        if column < self.num_columns {
            Ok(())
        } else {
            Err(Error::ColumnOutOfRange {
                column,
                num_columns: self.num_columns,
            })
        }
    }

    /// Read-only view of a column.
    pub fn column(&self, column: usize) -> Result<Column<'_>> {
        self.check_column(column)?;
        Ok(Column {
            index: column,
            synapses: self.synapses.column(column),
            connected: self.synapses.connected_mask(column),
            overlap_duty_cycle: self.overlap_duty_cycles[column],
            active_duty_cycle: self.active_duty_cycles[column],
            min_overlap_duty_cycle: self.min_overlap_duty_cycles[column],
            min_active_duty_cycle: self.min_active_duty_cycles[column],
            boost_factor: self.boost_factors[column],
        })
    }

    /// Dense potential pool of a column: one flag per input bit.
    pub fn potential(&self, column: usize) -> Result<Vec<bool>> {
        self.check_column(column)?;
        let mut dense = vec![false; self.num_inputs];
        for syn in self.synapses.column(column) {
            dense[syn.index] = true;
        }
        Ok(dense)
    }

    /// Dense permanences of a column: one value per input bit, zero outside the potential pool.
    pub fn permanence(&self, column: usize) -> Result<Vec<f32>> {
        self.check_column(column)?;
        let mut dense = vec![0.0; self.num_inputs];
        for syn in self.synapses.column(column) {
            dense[syn.index] = syn.permanence;
        }
        Ok(dense)
    }

    /// Dense connected synapses of a column: one flag per input bit.
    pub fn connected_synapses(&self, column: usize) -> Result<Vec<bool>> {
        self.check_column(column)?;
        let mut dense = vec![false; self.num_inputs];
        for input in self.synapses.connected_inputs(column) {
            dense[input] = true;
        }
        Ok(dense)
    }

    /// Overwrites the permanences of a column from a dense vector of `num_inputs` values.
    /// Values outside the potential pool are ignored. The column is settled without raising.
    pub fn set_permanence(&mut self, column: usize, permanence: &[f32]) -> Result<()> {
        self.check_column(column)?;
        check_length("permanence", self.num_inputs, permanence.len())?;
        for syn in self.synapses.column_mut(column) {
            syn.permanence = permanence[syn.index];
        }
        self.synapses.update_column_permanences(
            column,
            false,
            self.stimulus_threshold,
            &self.synapse_permanence_options,
        );
        Ok(())
    }

    pub fn set_boost_factors(&mut self, boost_factors: &[f32]) -> Result<()> {
        check_length("boost_factors", self.num_columns, boost_factors.len())?;
        self.boost_factors.copy_from_slice(boost_factors);
        Ok(())
    }

    pub fn set_overlap_duty_cycles(&mut self, duty_cycles: &[f32]) -> Result<()> {
        check_length("overlap_duty_cycles", self.num_columns, duty_cycles.len())?;
        self.overlap_duty_cycles.copy_from_slice(duty_cycles);
        Ok(())
    }

    pub fn set_active_duty_cycles(&mut self, duty_cycles: &[f32]) -> Result<()> {
        check_length("active_duty_cycles", self.num_columns, duty_cycles.len())?;
        self.active_duty_cycles.copy_from_slice(duty_cycles);
        Ok(())
    }

    pub fn set_min_overlap_duty_cycles(&mut self, duty_cycles: &[f32]) -> Result<()> {
        check_length("min_overlap_duty_cycles", self.num_columns, duty_cycles.len())?;
        self.min_overlap_duty_cycles.copy_from_slice(duty_cycles);
        Ok(())
    }

    pub fn set_min_active_duty_cycles(&mut self, duty_cycles: &[f32]) -> Result<()> {
        check_length("min_active_duty_cycles", self.num_columns, duty_cycles.len())?;
        self.min_active_duty_cycles.copy_from_slice(duty_cycles);
        Ok(())
    }

    /// Mutable inhibition scores of the current iteration, between boosting and inhibition.
    pub(crate) fn boosted_overlaps_mut(&mut self) -> &mut [f32] {
        &mut self.boosted_overlaps
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn input_dimensions(&self) -> &[usize] {
        self.input_topology.dimensions()
    }

    pub fn column_dimensions(&self) -> &[usize] {
        self.column_topology.dimensions()
    }

    pub fn potential_radius(&self) -> usize {
        self.potential_radius
    }

    pub fn potential_pct(&self) -> f32 {
        self.potential_percentage
    }

    pub fn global_inhibition(&self) -> bool {
        self.global_inhibition
    }

    pub fn inhibition_density(&self) -> InhibitionDensity {
        self.inhibition_density
    }

    pub fn stimulus_threshold(&self) -> u32 {
        self.stimulus_threshold
    }

    /// The current inhibition radius. Derived from connectivity; it cannot be set.
    pub fn inhibition_radius(&self) -> usize {
        self.inhibition_radius
    }

    pub fn duty_cycle_period(&self) -> u32 {
        self.duty_cycle_period
    }

    pub fn max_boost(&self) -> f32 {
        self.max_boost
    }

    pub fn update_period(&self) -> u32 {
        self.update_period
    }

    pub fn wrap_around(&self) -> bool {
        self.wrap_around
    }

    pub fn iteration_num(&self) -> u64 {
        self.iteration_num
    }

    pub fn iteration_learn_num(&self) -> u64 {
        self.iteration_learn_num
    }

    pub fn permanence_options(&self) -> &PermanenceOptions {
        &self.synapse_permanence_options
    }

    pub fn boost_factors(&self) -> &[f32] {
        &self.boost_factors
    }

    pub fn overlap_duty_cycles(&self) -> &[f32] {
        &self.overlap_duty_cycles
    }

    pub fn active_duty_cycles(&self) -> &[f32] {
        &self.active_duty_cycles
    }

    pub fn min_overlap_duty_cycles(&self) -> &[f32] {
        &self.min_overlap_duty_cycles
    }

    pub fn min_active_duty_cycles(&self) -> &[f32] {
        &self.min_active_duty_cycles
    }

    pub fn connected_counts(&self) -> &[usize] {
        self.synapses.connected_counts()
    }

    /// Overlaps of the last `compute` call, after the stimulus threshold.
    pub fn overlaps(&self) -> &[u32] {
        &self.overlaps
    }

    /// Inhibition scores of the last `compute` call (before tie-breaking).
    pub fn boosted_overlaps(&self) -> &[f32] {
        &self.boosted_overlaps
    }

    /// Active columns of the last `compute` call.
    pub fn active_columns(&self) -> &[usize] {
        &self.active_columns
    }

    pub fn synapses(&self) -> &Synapses {
        &self.synapses
    }
}

/// Moves every duty cycle one step of an exponential moving average with the given period.
fn update_duty_cycles_helper(duty_cycles: &mut [f32], new_values: &[bool], period: f32) {
    debug_assert!(period >= 1.0);
    duty_cycles
        .iter_mut()
        .zip(new_values)
        .for_each(|(duty, &value)| {
            *duty = (*duty * (period - 1.0) + if value { 1.0 } else { 0.0 }) / period;
        });
}

/// Radius that covers the average connected span, measured in columns.
fn inhibition_radius_for(avg_connected_span: f32, columns_per_input: f32) -> usize {
    let diameter = avg_connected_span * columns_per_input;
    ((diameter - 1.0) / 2.0).max(1.0).round() as usize
}

fn check_length(name: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::LengthMismatch {
            name,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_1d(num_inputs: usize, num_columns: usize) -> SpatialPoolerParams {
        SpatialPoolerParams {
            input_dimensions: vec![num_inputs],
            column_dimensions: vec![num_columns],
            potential_radius: num_inputs,
            potential_pct: 1.0,
            global_inhibition: true,
            local_area_density: Some(0.25),
            num_active_columns_per_inh_area: None,
            ..Default::default()
        }
    }

    fn uniform(sp: &mut SpatialPooler, value: f32) {
        let dense = vec![value; sp.num_inputs()];
        for col in 0..sp.num_columns() {
            sp.set_permanence(col, &dense).unwrap();
        }
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn map_column_1d_and_2d() {
        let sp = SpatialPooler::new(SpatialPoolerParams {
            potential_radius: 2,
            ..params_1d(12, 4)
        })
        .unwrap();
        let centers: Vec<usize> = (0..4).map(|col| sp.map_column(col)).collect();
        assert_eq!(centers, vec![1, 4, 7, 10]);

        let sp = SpatialPooler::new(SpatialPoolerParams {
            input_dimensions: vec![36, 12],
            column_dimensions: vec![12, 4],
            potential_radius: 2,
            ..params_1d(1, 1)
        })
        .unwrap();
        // Column (3, 2) sits at input (10, 7).
        assert_eq!(sp.map_column(3 * 4 + 2), 10 * 12 + 7);
        // Last column is clamped into range.
        assert_eq!(sp.map_column(47), 34 * 12 + 10);
    }

    #[test]
    fn potential_pools_follow_radius_and_pct() {
        let sp = SpatialPooler::new(SpatialPoolerParams {
            potential_radius: 2,
            wrap_around: false,
            ..params_1d(12, 4)
        })
        .unwrap();
        let pool: Vec<usize> = sp.column(0).unwrap().potential_pool().collect();
        assert_eq!(pool, vec![0, 1, 2, 3]);

        let sp = SpatialPooler::new(SpatialPoolerParams {
            potential_radius: 2,
            wrap_around: true,
            ..params_1d(12, 4)
        })
        .unwrap();
        let pool: Vec<usize> = sp.column(0).unwrap().potential_pool().collect();
        assert_eq!(pool, vec![0, 1, 2, 3, 11]);

        let sp = SpatialPooler::new(SpatialPoolerParams {
            potential_radius: 2,
            potential_pct: 0.5,
            ..params_1d(12, 4)
        })
        .unwrap();
        for col in 0..4 {
            // round(5 * 0.5) = 3
            assert_eq!(sp.column(col).unwrap().potential_pool().count(), 3);
        }
    }

    #[test]
    fn construction_is_deterministic_per_seed() {
        let a = SpatialPooler::new(params_1d(30, 20)).unwrap();
        let b = SpatialPooler::new(params_1d(30, 20)).unwrap();
        let c = SpatialPooler::new(SpatialPoolerParams {
            seed: 7,
            ..params_1d(30, 20)
        })
        .unwrap();
        assert_eq!(a.synapses(), b.synapses());
        assert_eq!(a.tie_breaker, b.tie_breaker);
        assert_ne!(a.synapses(), c.synapses());
    }

    #[test]
    fn rejects_input_of_wrong_length() {
        let mut sp = SpatialPooler::new(params_1d(10, 8)).unwrap();
        assert_eq!(
            sp.compute(&[true; 9], true),
            Err(Error::InputSizeMismatch {
                expected: 10,
                actual: 9
            })
        );
        assert_eq!(sp.iteration_num(), 0);
    }

    #[test]
    fn stimulus_threshold_zeroes_small_overlaps() {
        let mut sp = SpatialPooler::new(SpatialPoolerParams {
            stimulus_threshold: 3,
            ..params_1d(6, 4)
        })
        .unwrap();
        uniform(&mut sp, 0.5);
        let input = [true, true, false, false, false, false];
        sp.compute(&input, false).unwrap();
        assert_eq!(sp.overlaps(), &[0, 0, 0, 0]);
        assert!(sp.active_columns().is_empty());

        let input = [true, true, true, false, false, false];
        sp.compute(&input, false).unwrap();
        assert_eq!(sp.overlaps(), &[3, 3, 3, 3]);
    }

    #[test]
    fn columns_without_connections_never_win() {
        let mut sp = SpatialPooler::new(SpatialPoolerParams {
            local_area_density: Some(0.5),
            ..params_1d(6, 4)
        })
        .unwrap();
        uniform(&mut sp, 0.5);
        sp.set_permanence(2, &[0.0; 6]).unwrap();
        sp.set_permanence(3, &[0.0; 6]).unwrap();
        assert_eq!(sp.connected_counts(), &[6, 6, 0, 0]);

        let active = sp.compute(&[true; 6], false).unwrap();
        assert_eq!(active, vec![0, 1]);
        let active = sp.compute(&[false; 6], false).unwrap();
        assert!(active.is_empty());
    }

    #[test]
    fn overlap_percentages_guard_empty_columns() {
        let mut sp = SpatialPooler::new(params_1d(4, 2)).unwrap();
        sp.set_permanence(0, &[0.5, 0.5, 0.0, 0.0]).unwrap();
        sp.set_permanence(1, &[0.0; 4]).unwrap();
        sp.compute(&[true, false, true, true], false).unwrap();
        assert_eq!(sp.overlap_percentages(), vec![0.5, 0.0]);
    }

    #[test]
    fn learning_off_leaves_state_untouched() {
        let mut sp = SpatialPooler::new(params_1d(20, 16)).unwrap();
        let before = sp.synapses().clone();
        let input: Vec<bool> = (0..20).map(|i| i % 3 == 0).collect();

        let first = sp.compute(&input, false).unwrap();
        let second = sp.compute(&input, false).unwrap();

        assert_eq!(first, second);
        assert_eq!(sp.synapses(), &before);
        assert_eq!(sp.iteration_num(), 2);
        assert_eq!(sp.iteration_learn_num(), 0);
        assert!(sp.active_duty_cycles().iter().all(|&dc| dc == 0.0));
    }

    #[test]
    fn adapt_synapses_only_touches_active_columns() {
        let mut sp = SpatialPooler::new(params_1d(8, 4)).unwrap();
        uniform(&mut sp, 0.5);
        sp.active_columns = vec![0, 2];
        let input = [true, false, true, false, true, false, true, false];
        sp.adapt_synapses(&input);

        let expected: Vec<f32> = input.iter().map(|&on| if on { 0.6 } else { 0.49 }).collect();
        assert_close(&sp.permanence(0).unwrap(), &expected);
        assert_close(&sp.permanence(2).unwrap(), &expected);
        assert_close(&sp.permanence(1).unwrap(), &[0.5; 8]);
        assert_close(&sp.permanence(3).unwrap(), &[0.5; 8]);
    }

    #[test]
    fn adapt_synapses_clips_and_trims() {
        let mut sp = SpatialPooler::new(params_1d(4, 1)).unwrap();
        sp.set_permanence(0, &[0.95, 0.055, 0.3, 0.3]).unwrap();
        sp.active_columns = vec![0];
        sp.adapt_synapses(&[true, false, false, true]);
        // 0.055 - 0.01 falls below the trim threshold (0.05).
        assert_close(&sp.permanence(0).unwrap(), &[1.0, 0.0, 0.29, 0.4]);
        assert_eq!(
            sp.connected_synapses(0).unwrap(),
            vec![true, false, true, true]
        );
    }

    #[test]
    fn duty_cycle_helper() {
        let mut dc = [0.5, 0.5, 0.0, 1.0];
        update_duty_cycles_helper(&mut dc, &[true, false, true, false], 2.0);
        assert_eq!(dc, [0.75, 0.25, 0.5, 0.5]);

        let mut dc = [0.2; 2];
        update_duty_cycles_helper(&mut dc, &[true, false], 1.0);
        assert_eq!(dc, [1.0, 0.0]);
    }

    #[test]
    fn duty_cycles_use_growing_period() {
        let mut sp = SpatialPooler::new(SpatialPoolerParams {
            duty_cycle_period: 1000,
            ..params_1d(4, 4)
        })
        .unwrap();
        uniform(&mut sp, 0.5);
        sp.overlaps = vec![1, 0, 1, 0];
        sp.active_columns = vec![0];
        sp.iteration_num = 1;
        sp.update_duty_cycles();
        assert_eq!(sp.overlap_duty_cycles(), &[1.0, 0.0, 1.0, 0.0]);
        assert_eq!(sp.active_duty_cycles(), &[1.0, 0.0, 0.0, 0.0]);

        sp.overlaps = vec![0, 0, 1, 1];
        sp.active_columns = vec![];
        sp.iteration_num = 2;
        sp.update_duty_cycles();
        assert_eq!(sp.overlap_duty_cycles(), &[0.5, 0.0, 1.0, 0.5]);
        assert_eq!(sp.active_duty_cycles(), &[0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn iteration_counters_run_past_u32() {
        let mut sp = SpatialPooler::new(params_1d(8, 4)).unwrap();
        sp.iteration_num = u64::from(u32::MAX);
        sp.iteration_learn_num = u64::from(u32::MAX);
        sp.compute(&[true; 8], true).unwrap();

        assert_eq!(sp.iteration_num(), u64::from(u32::MAX) + 1);
        assert_eq!(sp.iteration_learn_num(), u64::from(u32::MAX) + 1);
        // Still averaged over the full period of 1000.
        for (col, &duty) in sp.active_duty_cycles().iter().enumerate() {
            let expected = if sp.active_columns().contains(&col) { 0.001 } else { 0.0 };
            assert!((duty - expected).abs() < 1e-7, "{duty} != {expected}");
        }
    }

    #[test]
    fn boost_factors_interpolate_linearly() {
        let mut sp = SpatialPooler::new(params_1d(4, 6)).unwrap();
        sp.min_active_duty_cycles = vec![0.0, 0.1, 0.1, 0.1, 0.2, 0.2];
        sp.active_duty_cycles = vec![0.0, 0.0, 0.05, 0.1, 0.3, 0.15];
        sp.update_boost_factors();

        assert_close(sp.boost_factors(), &[1.0, 10.0, 5.5, 1.0, 1.0, 3.25]);
        // A column that never fired gets exactly the maximum boost.
        assert_eq!(sp.boost_factors()[1], sp.max_boost());
    }

    #[test]
    fn weak_columns_get_bumped() {
        let mut sp = SpatialPooler::new(params_1d(4, 3)).unwrap();
        uniform(&mut sp, 0.095);
        assert_eq!(sp.connected_counts(), &[0, 0, 0]);
        sp.overlap_duty_cycles = vec![0.0, 0.5, 0.05];
        sp.min_overlap_duty_cycles = vec![0.1, 0.1, 0.1];
        sp.bump_up_weak_columns();

        assert_close(&sp.permanence(0).unwrap(), &[0.105; 4]);
        assert_close(&sp.permanence(1).unwrap(), &[0.095; 4]);
        assert_close(&sp.permanence(2).unwrap(), &[0.105; 4]);
        assert_eq!(sp.connected_counts(), &[4, 0, 4]);
    }

    #[test]
    fn min_duty_cycles_global() {
        let mut sp = SpatialPooler::new(SpatialPoolerParams {
            min_pct_overlap_duty_cycle: 0.01,
            min_pct_active_duty_cycle: 0.02,
            ..params_1d(4, 5)
        })
        .unwrap();
        sp.overlap_duty_cycles = vec![0.06, 1.0, 3.0, 6.0, 0.5];
        sp.active_duty_cycles = vec![0.6, 0.07, 0.5, 0.4, 0.3];
        sp.update_min_duty_cycles();
        assert_close(sp.min_overlap_duty_cycles(), &[0.06; 5]);
        assert_close(sp.min_active_duty_cycles(), &[0.012; 5]);
    }

    #[test]
    fn min_duty_cycles_local() {
        let mut sp = SpatialPooler::new(SpatialPoolerParams {
            global_inhibition: false,
            potential_radius: 0,
            wrap_around: false,
            min_pct_overlap_duty_cycle: 0.1,
            min_pct_active_duty_cycle: 0.1,
            ..params_1d(8, 8)
        })
        .unwrap();
        sp.inhibition_radius = 1;
        assert!(!sp.uses_global_inhibition());
        sp.overlap_duty_cycles = vec![0.7, 0.1, 0.5, 0.01, 0.78, 0.55, 0.1, 0.001];
        sp.active_duty_cycles = vec![0.9, 0.3, 0.5, 0.7, 0.1, 0.01, 0.08, 0.12];
        sp.update_min_duty_cycles();
        assert_close(
            sp.min_overlap_duty_cycles(),
            &[0.07, 0.07, 0.05, 0.078, 0.078, 0.078, 0.055, 0.01],
        );
        assert_close(
            sp.min_active_duty_cycles(),
            &[0.09, 0.09, 0.07, 0.07, 0.07, 0.01, 0.012, 0.012],
        );
    }

    #[test]
    fn inhibition_radius_formula() {
        // ((3 * 4) - 1) / 2 rounds up to 6.
        assert_eq!(inhibition_radius_for(3.0, 4.0), 6);
        // Clipped at 1.
        assert_eq!(inhibition_radius_for(0.5, 1.2), 1);
        assert_eq!(inhibition_radius_for(0.0, 1.0), 1);
        // ((2.4 * 2) - 1) / 2 rounds up to 2.
        assert_eq!(inhibition_radius_for(2.4, 2.0), 2);
    }

    #[test]
    fn inhibition_radius_is_full_extent_when_global() {
        let sp = SpatialPooler::new(SpatialPoolerParams {
            input_dimensions: vec![3, 3, 2],
            column_dimensions: vec![57, 31, 2],
            potential_radius: 1,
            ..params_1d(1, 1)
        })
        .unwrap();
        assert_eq!(sp.inhibition_radius(), 57);
        assert!(sp.uses_global_inhibition());
    }

    #[test]
    fn avg_columns_per_input_averages_dimensions() {
        let sp = |input: Vec<usize>, columns: Vec<usize>| {
            SpatialPooler::new(SpatialPoolerParams {
                input_dimensions: input,
                column_dimensions: columns,
                potential_radius: 1,
                ..params_1d(1, 1)
            })
            .unwrap()
        };
        assert_eq!(sp(vec![4, 4, 4, 4], vec![2, 2, 2, 2]).avg_columns_per_input(), 0.5);
        assert_eq!(sp(vec![5], vec![25]).avg_columns_per_input(), 5.0);
        assert_eq!(sp(vec![3, 3, 3, 3], vec![3, 6, 9, 12]).avg_columns_per_input(), 2.5);
        let expected = (2.0 / 7.0 + 2.0 / 5.0 + 2.0 / 1.0 + 2.0 / 3.0) / 4.0;
        assert!((sp(vec![7, 5, 1, 3], vec![2, 2, 2, 2]).avg_columns_per_input() - expected).abs() < 1e-6);
    }

    #[test]
    fn avg_connected_span_1d_and_2d() {
        let mut sp = SpatialPooler::new(params_1d(8, 3)).unwrap();
        let rows = [
            [0.0, 0.5, 0.0, 0.5, 0.0, 0.5, 0.0, 0.5],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0],
        ];
        for (col, row) in rows.iter().enumerate() {
            sp.set_permanence(col, row).unwrap();
        }
        assert_eq!(sp.avg_connected_span_for_column(0), 7.0);
        assert_eq!(sp.avg_connected_span_for_column(1), 0.0);
        assert_eq!(sp.avg_connected_span_for_column(2), 1.0);

        let mut sp = SpatialPooler::new(SpatialPoolerParams {
            input_dimensions: vec![4, 4],
            column_dimensions: vec![2, 2],
            potential_radius: 4,
            ..params_1d(1, 1)
        })
        .unwrap();
        let mut dense = vec![0.0; 16];
        // Rows 0..=2 and columns 1..=2.
        dense[1] = 0.5;
        dense[2 * 4 + 2] = 0.5;
        sp.set_permanence(0, &dense).unwrap();
        assert_eq!(sp.avg_connected_span_for_column(0), 2.5);
    }

    #[test]
    fn update_inhibition_radius_from_connectivity() {
        let mut sp = SpatialPooler::new(SpatialPoolerParams {
            global_inhibition: false,
            wrap_around: false,
            ..params_1d(10, 20)
        })
        .unwrap();
        // Every column spans 4 inputs; 2 columns per input: diameter 8, radius round(3.5) = 4.
        let mut dense = vec![0.0; 10];
        dense[3] = 0.5;
        dense[6] = 0.5;
        for col in 0..20 {
            sp.set_permanence(col, &dense).unwrap();
        }
        sp.update_inhibition_radius();
        assert_eq!(sp.inhibition_radius(), 4);
    }

    #[test]
    fn strip_unlearned_columns_drops_virgins() {
        let mut sp = SpatialPooler::new(params_1d(4, 4)).unwrap();
        sp.set_active_duty_cycles(&[0.0, 0.2, 0.0, 0.1]).unwrap();
        assert_eq!(sp.strip_unlearned_columns(&[0, 1, 2, 3]), vec![1, 3]);
    }

    #[test]
    fn setters_validate_shape() {
        let mut sp = SpatialPooler::new(params_1d(4, 4)).unwrap();
        assert!(matches!(
            sp.set_boost_factors(&[1.0; 3]),
            Err(Error::LengthMismatch { name: "boost_factors", .. })
        ));
        assert!(matches!(
            sp.set_permanence(4, &[0.0; 4]),
            Err(Error::ColumnOutOfRange { column: 4, num_columns: 4 })
        ));
        assert!(sp.column(3).is_ok());
    }
}
