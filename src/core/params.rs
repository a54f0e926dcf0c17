//! Construction parameters of the Spatial Pooler.
//!
//! `SpatialPoolerParams` is a flat, serde-friendly set of named values that is established once at
//! construction. Validation turns it into the internal form used by the pooler: a closed
//! [`InhibitionDensity`] instead of two mutually exclusive knobs, and the derived
//! [`PermanenceOptions`] that drive every permanence update.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters for creating a [`SpatialPooler`](super::spatial_pooler::SpatialPooler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialPoolerParams {
    /// Shape of the input space, e.g. `vec![100]` or `vec![32, 32]`.
    pub input_dimensions: Vec<usize>,

    /// Shape of the column space. Must have as many dimensions as the input space.
    pub column_dimensions: Vec<usize>,

    /// Half-width of the hypercube of inputs a column may ever connect to. Clamped to the number of inputs.
    pub potential_radius: usize,

    /// Fraction of the inputs within `potential_radius` that end up in a column's potential pool.
    pub potential_pct: f32,

    /// If true, all columns compete with each other. Otherwise columns compete within the inhibition radius.
    pub global_inhibition: bool,

    /// Desired density of active columns inside an inhibition area, in `(0, 0.5]`.
    /// Mutually exclusive with `num_active_columns_per_inh_area`.
    pub local_area_density: Option<f32>,

    /// Desired number of active columns inside an inhibition area.
    /// Mutually exclusive with `local_area_density`.
    pub num_active_columns_per_inh_area: Option<usize>,

    /// Minimum overlap a column needs before it can take part in inhibition.
    pub stimulus_threshold: u32,

    /// Permanence decrement of synapses to inactive inputs of a winning column.
    pub syn_perm_inactive_dec: f32,

    /// Permanence increment of synapses to active inputs of a winning column.
    pub syn_perm_active_inc: f32,

    /// A synapse is connected once its permanence is strictly above this value.
    pub syn_perm_connected: f32,

    /// Fraction of the neighborhood's best overlap duty cycle below which a column gets its permanences bumped.
    pub min_pct_overlap_duty_cycle: f32,

    /// Fraction of the neighborhood's best active duty cycle below which a column gets boosted.
    pub min_pct_active_duty_cycle: f32,

    /// Averaging window of the duty cycles.
    pub duty_cycle_period: u32,

    /// Boost factor of a column that has never been active.
    pub max_boost: f32,

    /// Seed of the pooler's pseudo-random number generator.
    pub seed: u64,

    /// If true, potential pools and neighborhoods wrap around the edges of their space.
    pub wrap_around: bool,

    /// Number of iterations between recomputations of the inhibition radius and the min duty cycles.
    pub update_period: u32,

    /// Fraction of each column's potential synapses that start out connected.
    pub init_connected_pct: f32,
}

impl Default for SpatialPoolerParams {
    fn default() -> Self {
        Self {
            input_dimensions: vec![32, 32],
            column_dimensions: vec![64, 64],
            potential_radius: 16,
            potential_pct: 0.5,
            global_inhibition: false,
            local_area_density: None,
            num_active_columns_per_inh_area: Some(10),
            stimulus_threshold: 0,
            syn_perm_inactive_dec: 0.01,
            syn_perm_active_inc: 0.1,
            syn_perm_connected: 0.10,
            min_pct_overlap_duty_cycle: 0.001,
            min_pct_active_duty_cycle: 0.001,
            duty_cycle_period: 1000,
            max_boost: 10.0,
            seed: 42,
            wrap_around: true,
            update_period: 50,
            init_connected_pct: 0.5,
        }
    }
}

/// How the target density of active columns is determined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InhibitionDensity {
    /// A fixed fraction of the columns in every inhibition area.
    LocalArea(f32),

    /// A fixed number of columns per inhibition area. The density shrinks as the inhibition area grows.
    PerInhibitionArea(usize),
}

impl InhibitionDensity {
    /// Target density for an inhibition area of `inhibition_area` columns.
    /// An empty area is treated as `num_columns`; the result always lies in `(0, 0.5]`.
    #[inline]
    pub fn density(&self, inhibition_area: usize, num_columns: usize) -> f32 {
        match *self {
            Self::LocalArea(density) => density.clamp(f32::MIN_POSITIVE, 0.5),
            Self::PerInhibitionArea(num_active) => {
                let area = if inhibition_area == 0 {
                    num_columns
                } else {
                    inhibition_area.min(num_columns)
                };
                (num_active as f32 / area.max(1) as f32).clamp(f32::MIN_POSITIVE, 0.5)
            }
        }
    }
}

/// Options governing how synapse permanence is adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PermanenceOptions {
    pub inactive_decrement: f32,
    pub active_increment: f32,
    pub connected: f32,
    pub below_stimulus_increment: f32,
    pub min: f32,
    pub max: f32,
    pub trim_threshold: f32,
}

impl PermanenceOptions {
    /// Derives the full option set from the user-facing increments and connection threshold.
    #[inline]
    pub fn new(active_increment: f32, inactive_decrement: f32, connected: f32) -> Self {
        Self {
            inactive_decrement,
            active_increment,
            connected,
            below_stimulus_increment: connected / 10.0,
            min: 0.0,
            max: 1.0,
            trim_threshold: active_increment / 2.0,
        }
    }

    /// Whether a permanence value counts as a connected synapse.
    #[inline]
    pub fn is_connected(&self, permanence: f32) -> bool {
        permanence > self.connected
    }
}

impl SpatialPoolerParams {
    pub fn num_inputs(&self) -> usize {
        self.input_dimensions.iter().product()
    }

    pub fn num_columns(&self) -> usize {
        self.column_dimensions.iter().product()
    }

    /// Checks every parameter and returns the resolved inhibition density.
    pub fn validate(&self) -> Result<InhibitionDensity> {
        if self.input_dimensions.is_empty() || self.column_dimensions.is_empty() {
            return Err(Error::InvalidDimensions(
                "input and column dimensions must not be empty".to_string(),
            ));
        }
        if self.input_dimensions.len() != self.column_dimensions.len() {
            return Err(Error::InvalidDimensions(format!(
                "input space has {} dimensions but column space has {}",
                self.input_dimensions.len(),
                self.column_dimensions.len()
            )));
        }
        if self.num_inputs() == 0 {
            return Err(Error::InvalidParameter {
                name: "input_dimensions",
                message: "number of inputs must be positive".to_string(),
            });
        }
        if self.num_columns() == 0 {
            return Err(Error::InvalidParameter {
                name: "column_dimensions",
                message: "number of columns must be positive".to_string(),
            });
        }
        if !(self.potential_pct > 0.0 && self.potential_pct <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "potential_pct",
                message: format!("{} is not in (0, 1]", self.potential_pct),
            });
        }

        let density = match (self.local_area_density, self.num_active_columns_per_inh_area) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidParameter {
                    name: "local_area_density",
                    message: "cannot be combined with num_active_columns_per_inh_area".to_string(),
                })
            }
            (None, None) => {
                return Err(Error::InvalidParameter {
                    name: "local_area_density",
                    message: "either local_area_density or num_active_columns_per_inh_area is required"
                        .to_string(),
                })
            }
            (Some(density), None) => {
                if !(density > 0.0 && density <= 0.5) {
                    return Err(Error::InvalidParameter {
                        name: "local_area_density",
                        message: format!("{density} is not in (0, 0.5]"),
                    });
                }
                InhibitionDensity::LocalArea(density)
            }
            (None, Some(num_active)) => {
                if num_active == 0 {
                    return Err(Error::InvalidParameter {
                        name: "num_active_columns_per_inh_area",
                        message: "must be positive".to_string(),
                    });
                }
                InhibitionDensity::PerInhibitionArea(num_active)
            }
        };

        let unit = |name: &'static str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(Error::InvalidParameter {
                    name,
                    message: format!("{value} is not in [0, 1]"),
                })
            }
        };
        unit("syn_perm_inactive_dec", self.syn_perm_inactive_dec)?;
        unit("syn_perm_active_inc", self.syn_perm_active_inc)?;
        unit("syn_perm_connected", self.syn_perm_connected)?;
        unit("min_pct_overlap_duty_cycle", self.min_pct_overlap_duty_cycle)?;
        unit("min_pct_active_duty_cycle", self.min_pct_active_duty_cycle)?;
        unit("init_connected_pct", self.init_connected_pct)?;

        if self.syn_perm_active_inc / 2.0 >= self.syn_perm_connected {
            return Err(Error::InvalidParameter {
                name: "syn_perm_active_inc",
                message: "half of it (the trim threshold) must stay below syn_perm_connected"
                    .to_string(),
            });
        }
        if self.duty_cycle_period == 0 {
            return Err(Error::InvalidParameter {
                name: "duty_cycle_period",
                message: "must be positive".to_string(),
            });
        }
        if self.update_period == 0 {
            return Err(Error::InvalidParameter {
                name: "update_period",
                message: "must be positive".to_string(),
            });
        }
        if !(self.max_boost >= 1.0) {
            return Err(Error::InvalidParameter {
                name: "max_boost",
                message: format!("{} is below 1.0", self.max_boost),
            });
        }

        Ok(density)
    }

    /// The permanence options derived from these parameters.
    pub fn permanence_options(&self) -> PermanenceOptions {
        PermanenceOptions::new(
            self.syn_perm_active_inc,
            self.syn_perm_inactive_dec,
            self.syn_perm_connected,
        )
    }
}
