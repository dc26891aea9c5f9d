//! Anti-TB drug effects and their aggregation across an active regimen.

use serde::{Deserialize, Serialize};

use crate::parameters::InfectionParams;
use crate::strain::StrainKind;

/// The five per-day rate contributions of a single drug.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugEffects {
    /// Treatment-driven clearance of active or latent infection.
    pub clearance_rate: f64,
    /// Treatment-driven reversion of active disease to latency.
    pub inactivation_rate: f64,
    /// Rate of evolving first-line resistance under this drug.
    pub resistance_rate: f64,
    /// Rate of clearing into the pending-relapse state instead of a cure.
    pub relapse_rate: f64,
    /// Excess mortality attributable to the drug.
    pub mortality_rate: f64,
}

impl DrugEffects {
    /// The summed rate of the drug-driven outcomes that supersede natural
    /// history. Resistance evolution is a side channel, not an outcome: a
    /// regimen contributing only a resistance rate leaves the natural
    /// timers running.
    #[must_use]
    pub fn outcome_rate(&self) -> f64 {
        self.clearance_rate + self.inactivation_rate + self.relapse_rate + self.mortality_rate
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.outcome_rate() <= 0.0
    }
}

/// An active drug instance carried by a host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TbDrug {
    pub effects: DrugEffects,
    /// Days of regimen remaining; the drug is dropped when this reaches zero.
    pub remaining_days: f64,
}

/// Treatment history flags that degrade drug efficacy. Both latch on and
/// never reset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TreatmentHistory {
    pub failed: bool,
    pub relapsed: bool,
}

/// Sums the effects of all active drugs as seen by an infection with the
/// given strain. The resistance-mismatch multiplier and the treatment
/// history multipliers scale clearance and inactivation only; resistance,
/// relapse, and mortality contributions pass through unscaled.
#[must_use]
pub fn aggregate_drug_effects(
    drugs: &[TbDrug],
    strain: StrainKind,
    history: TreatmentHistory,
    params: &InfectionParams,
) -> DrugEffects {
    let mut total = DrugEffects::default();
    for drug in drugs {
        total.clearance_rate += drug.effects.clearance_rate;
        total.inactivation_rate += drug.effects.inactivation_rate;
        total.resistance_rate += drug.effects.resistance_rate;
        total.relapse_rate += drug.effects.relapse_rate;
        total.mortality_rate += drug.effects.mortality_rate;
    }

    let mut efficacy = 1.0;
    if strain == StrainKind::FirstLineResistant {
        efficacy *= params.drug_efficacy_multiplier_mdr;
    }
    if history.failed {
        efficacy *= params.drug_efficacy_multiplier_failed;
    }
    if history.relapsed {
        efficacy *= params.drug_efficacy_multiplier_relapsed;
    }
    total.clearance_rate *= efficacy;
    total.inactivation_rate *= efficacy;
    total
}
