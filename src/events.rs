//! Structural disease events emitted by individual updates.
//!
//! Every state-machine transition, treatment milestone, and death is
//! recorded as a [`DiseaseEvent`] in the individual's event buffer; the
//! simulation loop drains the buffer after each update, typically into a
//! transition report.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiseaseEvent {
    /// New latent infection on the slow-progression track.
    LatentSlow,
    /// New latent infection on the fast-progression track.
    LatentFast,
    /// Latent infection activated to presymptomatic disease.
    ActivationPresymptomatic,
    ActivationSmearPositive,
    ActivationSmearNegative,
    ActivationExtrapulmonary,
    /// Symptomatic disease reverted to latency.
    Inactivation,
    /// Infection cleared outright.
    Cleared,
    /// Infection cleared into the pending-relapse state.
    ClearedPendingRelapse,
    /// Pending relapse progressed back to presymptomatic disease.
    Relapse,
    TbDeath,
    /// Death from the HIV excess-mortality channel during active TB.
    HivCoinfectionDeath,
    /// A drug-sensitive infection evolved first-line resistance under
    /// treatment.
    EvolvedResistance,
    /// A new infection was acquired already carrying the resistant strain.
    ResistantAcquisition,
    /// A latent-slow infection was promoted to the fast track by exogenous
    /// reinfection.
    ExogenousFastProgression,
    TbDrugStarted,
    TbDrugExpired,
    /// A regimen ended while the host still had active disease.
    TreatmentFailed,
    /// A treated host later relapsed from the pending-relapse state.
    TreatmentRelapsed,
    ArtStarted,
    ArtStopped,
}

impl std::fmt::Display for DiseaseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
