//! The `FlatSpatialPooler` is a `SpatialPooler` over a flat (1-D) input and column space
//! with global inhibition only. It changes how winners are picked in two ways:
//! - Virgin columns (never active while learning) are forced to win while learning, so every
//!   column gets recruited before any column is reused.
//! - "High tier" columns, whose connected synapses almost all overlap the input, beat every
//!   column outside the tier regardless of boosting.
//!
//! Both promotions add a bonus of `max(boosted overlaps) + 1` to the column's score, which puts
//! it above any column without the bonus. Learning, duty cycles and boosting are the pooler's own.

use super::{params::SpatialPoolerParams, spatial_pooler::SpatialPooler};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters for creating a [`FlatSpatialPooler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatSpatialPoolerParams {
    /// Parameters of the underlying pooler. Dimensions are flattened, inhibition is always global
    /// and the potential radius always covers the whole input.
    pub base: SpatialPoolerParams,

    /// Columns whose overlap percentage is at least `1 - min_distance` form the high tier.
    pub min_distance: f32,

    /// Enables the high tier.
    pub use_high_tier: bool,

    /// Never learn: the pooler keeps its random initial connectivity.
    pub random_sp: bool,
}

impl Default for FlatSpatialPoolerParams {
    fn default() -> Self {
        Self {
            base: SpatialPoolerParams {
                input_dimensions: vec![1024],
                column_dimensions: vec![2048],
                potential_radius: 1024,
                global_inhibition: true,
                local_area_density: None,
                num_active_columns_per_inh_area: Some(40),
                ..Default::default()
            },
            min_distance: 0.0,
            use_high_tier: true,
            random_sp: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatSpatialPooler {
    pooler: SpatialPooler,
    min_distance: f32,
    use_high_tier: bool,
    random_sp: bool,
}

impl FlatSpatialPooler {
    pub fn new(params: FlatSpatialPoolerParams) -> Result<Self> {
        if !(0.0..=1.0).contains(&params.min_distance) {
            return Err(Error::InvalidParameter {
                name: "min_distance",
                message: format!("{} is not in [0, 1]", params.min_distance),
            });
        }

        params.base.validate()?;

        let num_inputs = params.base.num_inputs();
        let num_columns = params.base.num_columns();
        let base = SpatialPoolerParams {
            input_dimensions: vec![num_inputs],
            column_dimensions: vec![num_columns],
            potential_radius: num_inputs,
            global_inhibition: true,
            ..params.base
        };

        Ok(Self {
            pooler: SpatialPooler::new(base)?,
            min_distance: params.min_distance,
            use_high_tier: params.use_high_tier,
            random_sp: params.random_sp,
        })
    }

    /// Processes `input_pattern` and returns the active columns (sorted).
    ///
    /// Same as [`SpatialPooler::compute`], except that virgin columns (while learning) and
    /// high-tier columns are promoted above all others before inhibition.
    /// With `random_sp` set, learning is always off.
    pub fn compute(&mut self, input_pattern: &[bool], learn: bool) -> Result<Vec<usize>> {
        let learn = learn && !self.random_sp;

        self.pooler.begin_compute(input_pattern, learn)?;
        self.promote_columns(learn);
        self.pooler.inhibit_columns();
        if learn {
            self.pooler.learn(input_pattern);
        }

        Ok(self.pooler.active_columns().to_vec())
    }

    fn promote_columns(&mut self, learn: bool) {
        let virgin = if learn {
            self.virgin_columns()
        } else {
            Vec::new()
        };
        let high_tier = if self.use_high_tier {
            self.high_tier_columns()
        } else {
            Vec::new()
        };
        if virgin.is_empty() && high_tier.is_empty() {
            return;
        }

        let scores = self.pooler.boosted_overlaps_mut();
        let bonus = scores.iter().fold(0.0_f32, |acc, &s| acc.max(s)) + 1.0;
        for col in virgin {
            scores[col] = bonus;
        }
        for col in high_tier {
            scores[col] += bonus;
        }
    }

    /// Columns that have never been active while learning.
    pub fn virgin_columns(&self) -> Vec<usize> {
        self.pooler
            .active_duty_cycles()
            .iter()
            .enumerate()
            .filter(|(_, &duty)| duty == 0.0)
            .map(|(col, _)| col)
            .collect()
    }

    /// Columns with a non-zero overlap that covers at least `1 - min_distance` of their connected synapses,
    /// for the input of the last `compute` call.
    pub fn high_tier_columns(&self) -> Vec<usize> {
        let threshold = 1.0 - self.min_distance;
        self.pooler
            .overlap_percentages()
            .iter()
            .zip(self.pooler.overlaps())
            .enumerate()
            .filter(|(_, (&pct, &overlap))| overlap > 0 && pct >= threshold)
            .map(|(col, _)| col)
            .collect()
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn use_high_tier(&self) -> bool {
        self.use_high_tier
    }

    pub fn random_sp(&self) -> bool {
        self.random_sp
    }

    /// The underlying pooler.
    pub fn pooler(&self) -> &SpatialPooler {
        &self.pooler
    }

    /// The underlying pooler, e.g. to inspect or seed its state through the setters.
    pub fn pooler_mut(&mut self) -> &mut SpatialPooler {
        &mut self.pooler
    }
}
