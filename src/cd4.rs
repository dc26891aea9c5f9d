//! CD4-indexed modulation of TB natural history.
//!
//! HIV status enters the TB state machine only through CD4 count. Two lookup
//! structures cover the two access patterns: [`Cd4Map`] interpolates a
//! multiplier between configured breakpoints, and [`ActivationTable`] reads a
//! latent-activation hazard as a step function. [`ActivationSchedule`] turns
//! the table plus a forward CD4 trajectory into the per-window hazard vector
//! the latent timer is sampled against.

use serde::{Deserialize, Serialize};

use crate::error::TbsimError;

/// Piecewise-linear map from CD4 count to a multiplier, clamped at both
/// ends. At a breakpoint the configured value is returned exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cd4Map {
    strata: Vec<f64>,
    values: Vec<f64>,
}

impl Cd4Map {
    /// Builds a map from matched parallel arrays of breakpoints and values.
    ///
    /// # Errors
    ///
    /// Returns `TbsimError` if the arrays are empty or of different lengths.
    pub fn from_parallel(strata: &[f64], values: &[f64]) -> Result<Cd4Map, TbsimError> {
        if strata.is_empty() {
            return Err(TbsimError::from("CD4 map requires at least one stratum"));
        }
        if strata.len() != values.len() {
            return Err(TbsimError::from(format!(
                "CD4 map has {} strata but {} values",
                strata.len(),
                values.len()
            )));
        }
        Ok(Cd4Map {
            strata: strata.to_vec(),
            values: values.to_vec(),
        })
    }

    /// The multiplier at the given CD4 count, interpolating linearly between
    /// breakpoints and holding the end values outside the configured range.
    #[must_use]
    pub fn multiplier(&self, cd4: f64) -> f64 {
        if cd4 <= self.strata[0] {
            return self.values[0];
        }
        let last = self.strata.len() - 1;
        if cd4 >= self.strata[last] {
            return self.values[last];
        }
        // strata are strictly increasing, so the partition point is in range
        let upper = self.strata.partition_point(|&s| s < cd4);
        if (self.strata[upper] - cd4).abs() < f64::EPSILON {
            return self.values[upper];
        }
        let lower = upper - 1;
        let fraction = (cd4 - self.strata[lower]) / (self.strata[upper] - self.strata[lower]);
        self.values[lower] + fraction * (self.values[upper] - self.values[lower])
    }
}

/// Step-function map from CD4 count to a latent-activation hazard: the value
/// of the highest stratum not exceeding the CD4 count, clamped at both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationTable {
    strata: Vec<f64>,
    hazards: Vec<f64>,
}

impl ActivationTable {
    /// Builds a table from matched parallel arrays.
    ///
    /// # Errors
    ///
    /// Returns `TbsimError` if the arrays are empty or of different lengths.
    pub fn from_parallel(strata: &[f64], hazards: &[f64]) -> Result<ActivationTable, TbsimError> {
        if strata.is_empty() {
            return Err(TbsimError::from(
                "activation table requires at least one stratum",
            ));
        }
        if strata.len() != hazards.len() {
            return Err(TbsimError::from(format!(
                "activation table has {} strata but {} hazards",
                strata.len(),
                hazards.len()
            )));
        }
        Ok(ActivationTable {
            strata: strata.to_vec(),
            hazards: hazards.to_vec(),
        })
    }

    /// The hazard applying at the given CD4 count.
    #[must_use]
    pub fn hazard(&self, cd4: f64) -> f64 {
        let upper = self.strata.partition_point(|&s| s <= cd4);
        if upper == 0 {
            return self.hazards[0];
        }
        self.hazards[upper - 1]
    }
}

/// The full set of CD4 lookup structures built from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cd4Maps {
    /// Scales deposited infectiousness.
    pub infectiousness: Cd4Map,
    /// Scales the acquisition probability on exposure.
    pub susceptibility: Cd4Map,
    /// Scales the fast-progression fraction at infection.
    pub primary_progression: Cd4Map,
    /// Latent-activation hazard by CD4 stratum.
    pub activation: ActivationTable,
}

/// Latent-activation hazards along a host's projected CD4 trajectory, one
/// entry per `time_step` days starting now. Cached on the individual and
/// rebuilt whenever the trajectory changes (ART start or stop).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationSchedule {
    pub hazards: Vec<f64>,
    pub time_step: f64,
}

impl ActivationSchedule {
    /// Builds a schedule by reading the activation table at each point of a
    /// forward CD4 trajectory, scaling every hazard by `modifier`.
    #[must_use]
    pub fn from_trajectory(
        table: &ActivationTable,
        trajectory: &[f64],
        time_step: f64,
        modifier: f64,
    ) -> ActivationSchedule {
        ActivationSchedule {
            hazards: trajectory
                .iter()
                .map(|&cd4| table.hazard(cd4) * modifier)
                .collect(),
            time_step,
        }
    }

    /// The hazard `elapsed` days into the schedule, holding the last entry
    /// beyond the end.
    ///
    /// # Panics
    ///
    /// Panics if the schedule is empty.
    #[must_use]
    pub fn hazard_at(&self, elapsed: f64) -> f64 {
        assert!(!self.hazards.is_empty(), "empty activation schedule");
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let index = ((elapsed / self.time_step).max(0.0) as usize).min(self.hazards.len() - 1);
        self.hazards[index]
    }
}
