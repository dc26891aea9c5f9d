//! Strain identity and within-host resistance evolution.

use serde::{Deserialize, Serialize};

use crate::random::IndividualRng;

/// The drug-resistance class of a circulating strain. Transitions are
/// one-way: a resistant strain never reverts to sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrainKind {
    DrugSensitive,
    FirstLineResistant,
}

/// Draws whether a treated infection evolves first-line resistance this
/// sub-step. Evolution requires a drug-sensitive strain, active disease, and
/// positive clearance pressure from treatment; the per-sub-step probability
/// is `resistance_rate * dt`.
pub fn should_evolve_resistance(
    strain: StrainKind,
    active: bool,
    drug_clearance_rate: f64,
    resistance_rate: f64,
    dt: f64,
    rng: &mut IndividualRng,
) -> bool {
    if strain != StrainKind::DrugSensitive || !active || drug_clearance_rate <= 0.0 {
        return false;
    }
    rng.bernoulli(resistance_rate * dt)
}
