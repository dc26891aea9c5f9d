//! TB-side host immunology.
//!
//! Tracks acquired immunity across infections of one host, the immune
//! competence draw made at creation, and the age-stratified presentation
//! fractions used when an infection initializes or activates.

use serde::{Deserialize, Serialize};

use crate::parameters::{SusceptibilityParams, CHILD_AGE_CUTOFF_YEARS};
use crate::random::IndividualRng;

/// The fast-progressor fraction for a host of the given age.
#[must_use]
pub fn fast_fraction(params: &SusceptibilityParams, age_years: f64) -> f64 {
    if age_years < CHILD_AGE_CUTOFF_YEARS {
        params.fast_progressor_fraction_child
    } else {
        params.fast_progressor_fraction_adult
    }
}

#[must_use]
pub fn smear_positive_fraction(params: &SusceptibilityParams, age_years: f64) -> f64 {
    if age_years < CHILD_AGE_CUTOFF_YEARS {
        params.smear_positive_fraction_child
    } else {
        params.smear_positive_fraction_adult
    }
}

#[must_use]
pub fn extrapulmonary_fraction(params: &SusceptibilityParams, age_years: f64) -> f64 {
    if age_years < CHILD_AGE_CUTOFF_YEARS {
        params.extrapulmonary_fraction_child
    } else {
        params.extrapulmonary_fraction_adult
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TbSusceptibility {
    /// Baseline acquisition multiplier supplied at creation.
    immune_modifier: f64,
    /// Scales the host's deposited infectiousness.
    risk_modifier: f64,
    /// Drawn once at creation; incompetent hosts can lose acquired
    /// immunity over time.
    immune_competent: bool,
    /// Set after clearing an infection while no others remain.
    acquired_immunity: bool,
    /// Days remaining before acquired immunity may start decaying.
    decay_offset_remaining: f64,
    /// Current TB infections of this host.
    infection_count: u32,
}

impl TbSusceptibility {
    /// Creates the host's TB immunology, drawing immune competence.
    #[must_use]
    pub fn new(
        immune_modifier: f64,
        risk_modifier: f64,
        params: &SusceptibilityParams,
        rng: &mut IndividualRng,
    ) -> TbSusceptibility {
        let incompetent = rng.bernoulli(params.immune_loss_fraction);
        TbSusceptibility {
            immune_modifier,
            risk_modifier,
            immune_competent: !incompetent,
            acquired_immunity: false,
            decay_offset_remaining: 0.0,
            infection_count: 0,
        }
    }

    /// Advances immunity decay by one sub-step. Acquired immunity only
    /// decays for immune-incompetent hosts with no current infection, and
    /// only after the configured offset has elapsed since the last
    /// clearance.
    pub fn update(&mut self, dt: f64, params: &SusceptibilityParams, rng: &mut IndividualRng) {
        if self.immune_competent || !self.acquired_immunity || self.infection_count > 0 {
            return;
        }
        if self.decay_offset_remaining > 0.0 {
            self.decay_offset_remaining -= dt;
            return;
        }
        if rng.bernoulli(params.immunity_decay_rate * dt) {
            self.acquired_immunity = false;
        }
    }

    /// Registers a newly acquired infection.
    pub fn init_new_infection(&mut self) {
        self.infection_count += 1;
    }

    /// Registers the clearance of one infection. Clearing the last one
    /// grants acquired immunity and restarts the decay offset.
    pub fn infection_cleared(&mut self, params: &SusceptibilityParams) {
        self.infection_count = self.infection_count.saturating_sub(1);
        if self.infection_count == 0 {
            self.acquired_immunity = true;
            self.decay_offset_remaining = params.immunity_decay_offset;
        }
    }

    /// The host's acquisition multiplier, combining the creation-time
    /// modifier with acquired immunity.
    #[must_use]
    pub fn acquisition_multiplier(&self, params: &SusceptibilityParams) -> f64 {
        let immunity = if self.acquired_immunity {
            params.acquired_immunity_acquisition_multiplier
        } else {
            1.0
        };
        self.immune_modifier * immunity
    }

    /// Scales the infectiousness this host deposits.
    #[must_use]
    pub fn transmit_modifier(&self) -> f64 {
        self.risk_modifier
    }

    #[must_use]
    pub fn has_acquired_immunity(&self) -> bool {
        self.acquired_immunity
    }

    #[must_use]
    pub fn infection_count(&self) -> u32 {
        self.infection_count
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::random::{IndividualRng, NATURAL_HISTORY_STREAM};
    use assert_approx_eq::assert_approx_eq;

    fn rng(seed: u64) -> IndividualRng {
        IndividualRng::new(seed, NATURAL_HISTORY_STREAM, 0)
    }

    #[test]
    fn age_strata_split_at_fifteen() {
        let params = SusceptibilityParams::default();
        assert_approx_eq!(
            fast_fraction(&params, 14.9),
            params.fast_progressor_fraction_child
        );
        assert_approx_eq!(
            fast_fraction(&params, 15.0),
            params.fast_progressor_fraction_adult
        );
        assert_approx_eq!(
            smear_positive_fraction(&params, 40.0),
            params.smear_positive_fraction_adult
        );
        assert_approx_eq!(
            extrapulmonary_fraction(&params, 3.0),
            params.extrapulmonary_fraction_child
        );
    }

    #[test]
    fn clearing_last_infection_grants_immunity() {
        let params = SusceptibilityParams::default();
        let mut susceptibility = TbSusceptibility::new(1.0, 1.0, &params, &mut rng(1));
        susceptibility.init_new_infection();
        susceptibility.init_new_infection();
        susceptibility.infection_cleared(&params);
        assert!(!susceptibility.has_acquired_immunity());
        susceptibility.infection_cleared(&params);
        assert!(susceptibility.has_acquired_immunity());
        assert_approx_eq!(
            susceptibility.acquisition_multiplier(&params),
            params.acquired_immunity_acquisition_multiplier
        );
    }

    #[test]
    fn competent_hosts_keep_immunity() {
        let mut params = SusceptibilityParams::default();
        params.immune_loss_fraction = 0.0;
        params.immunity_decay_rate = 1.0;
        let mut rng = rng(2);
        let mut susceptibility = TbSusceptibility::new(1.0, 1.0, &params, &mut rng);
        susceptibility.init_new_infection();
        susceptibility.infection_cleared(&params);
        for _ in 0..100 {
            susceptibility.update(1.0, &params, &mut rng);
        }
        assert!(susceptibility.has_acquired_immunity());
    }

    #[test]
    fn incompetent_hosts_decay_after_offset() {
        let mut params = SusceptibilityParams::default();
        params.immune_loss_fraction = 1.0;
        params.immunity_decay_rate = 1.0;
        params.immunity_decay_offset = 10.0;
        let mut rng = rng(3);
        let mut susceptibility = TbSusceptibility::new(1.0, 1.0, &params, &mut rng);
        susceptibility.init_new_infection();
        susceptibility.infection_cleared(&params);

        // Offset countdown protects immunity first.
        for _ in 0..10 {
            susceptibility.update(1.0, &params, &mut rng);
            assert!(susceptibility.has_acquired_immunity());
        }
        // With decay probability 1 the next step drops it.
        susceptibility.update(1.0, &params, &mut rng);
        assert!(!susceptibility.has_acquired_immunity());
        assert_approx_eq!(susceptibility.acquisition_multiplier(&params), 1.0);
    }

    #[test]
    fn decay_paused_while_infected() {
        let mut params = SusceptibilityParams::default();
        params.immune_loss_fraction = 1.0;
        params.immunity_decay_rate = 1.0;
        let mut rng = rng(4);
        let mut susceptibility = TbSusceptibility::new(1.0, 1.0, &params, &mut rng);
        susceptibility.init_new_infection();
        susceptibility.infection_cleared(&params);
        susceptibility.init_new_infection();
        for _ in 0..50 {
            susceptibility.update(1.0, &params, &mut rng);
        }
        assert!(susceptibility.has_acquired_immunity());
    }

    #[test]
    fn modifiers_pass_through() {
        let params = SusceptibilityParams::default();
        let susceptibility = TbSusceptibility::new(0.8, 0.6, &params, &mut rng(5));
        assert_approx_eq!(susceptibility.acquisition_multiplier(&params), 0.8);
        assert_approx_eq!(susceptibility.transmit_modifier(), 0.6);
    }
}
