//! The per-infection TB state machine.
//!
//! Each infection carries its own state, a pre-sampled dwell timer, and the
//! outcome fractions that allocate what happens when the timer expires. The
//! competing-risks scheme samples the timer once on state entry from the
//! summed exit rate, then splits the outcome with a single uniform draw
//! against the recover/death fractions. Treatment suspends the natural
//! timers: while aggregated drug effects are non-zero, per-sub-step outcome
//! draws against the drug rates govern instead.

use serde::{Deserialize, Serialize};

use crate::cd4::ActivationSchedule;
use crate::drugs::DrugEffects;
use crate::parameters::{ActivePeriodDistribution, InfectionParams};
use crate::random::IndividualRng;
use crate::strain::{should_evolve_resistance, StrainKind};

// Power-law latent activation hazard rising with age in years, used when
// the slow progressor rate is configured negative.
const AGE_DEP_ALPHA: f64 = 2.4e-7;
const AGE_DEP_BETA: f64 = -2.5;

const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TbState {
    Latent,
    ActivePresymptomatic,
    ActiveSymptomatic,
    /// Cleared by treatment but carrying a scheduled relapse.
    PendingRelapse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presentation {
    SmearPositive,
    SmearNegative,
    Extrapulmonary,
}

/// A structural transition produced by one infection update. `Cleared`,
/// `ClearedPendingRelapse`, and `Fatal` are terminal for the record; the
/// host removes it (or dies) on seeing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    ActivatedPresymptomatic,
    ActivatedSymptomatic(Presentation),
    /// Symptomatic disease reverted to latency.
    Inactivated,
    /// Pending relapse progressed back to presymptomatic disease.
    Relapsed,
    Cleared,
    ClearedPendingRelapse,
    Fatal,
}

/// The result of one sub-step update.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfectionUpdate {
    pub state_change: Option<StateChange>,
    pub evolved_resistance: bool,
}

/// Host-side inputs to an infection update, assembled fresh each sub-step.
/// The drug effects are already aggregated for this infection's strain.
#[derive(Debug, Clone, Copy)]
pub struct HostFrame<'a> {
    pub params: &'a InfectionParams,
    pub age_years: f64,
    /// CD4 multiplier on the fast-progression fraction at infection.
    pub primary_progression_multiplier: f64,
    /// Forward activation hazards for coinfected hosts; `None` for
    /// HIV-negative hosts.
    pub activation_schedule: Option<&'a ActivationSchedule>,
    pub drug_effects: DrugEffects,
    /// Intervention multiplier folded into the symptomatic death rate.
    pub reduced_mortality: f64,
    pub fast_fraction: f64,
    pub smear_positive_fraction: f64,
    pub extrapulmonary_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Infection {
    strain: StrainKind,
    state: TbState,
    presentation: Option<Presentation>,
    fast_progressor: bool,
    /// Set when resistance was evolved under treatment rather than present
    /// at acquisition.
    evolved_resistance: bool,
    /// Days in the current state.
    duration: f64,
    /// Sampled dwell time for the current state.
    state_timer: f64,
    /// Probability that timer expiry resolves as recovery.
    recover_fraction: f64,
    /// Probability that timer expiry resolves as death (symptomatic only).
    death_fraction: f64,
    /// Per-day infectiousness before host-level modifiers.
    infectiousness: f64,
    /// Days since acquisition, across all states.
    total_duration: f64,
}

impl Infection {
    /// Creates a new latent infection, drawing the fast/slow track and the
    /// latency timer.
    #[must_use]
    pub fn new_latent(strain: StrainKind, frame: &HostFrame, rng: &mut IndividualRng) -> Infection {
        let fast_probability = frame.fast_fraction * frame.primary_progression_multiplier;
        let fast = rng.bernoulli(fast_probability.min(1.0));
        let mut infection = Infection {
            strain,
            state: TbState::Latent,
            presentation: None,
            fast_progressor: fast,
            evolved_resistance: false,
            duration: 0.0,
            state_timer: 0.0,
            recover_fraction: 0.0,
            death_fraction: 0.0,
            infectiousness: 0.0,
            total_duration: 0.0,
        };
        infection.sample_latency(frame, rng);
        infection
    }

    /// Whether the fast/slow Bernoulli at acquisition chose the fast track.
    #[must_use]
    pub fn is_fast_progressor(&self) -> bool {
        self.fast_progressor
    }

    #[must_use]
    pub fn state(&self) -> TbState {
        self.state
    }

    #[must_use]
    pub fn strain(&self) -> StrainKind {
        self.strain
    }

    #[must_use]
    pub fn presentation(&self) -> Option<Presentation> {
        self.presentation
    }

    #[must_use]
    pub fn evolved_resistance(&self) -> bool {
        self.evolved_resistance
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            TbState::ActivePresymptomatic | TbState::ActiveSymptomatic
        )
    }

    #[must_use]
    pub fn is_symptomatic(&self) -> bool {
        self.state == TbState::ActiveSymptomatic
    }

    /// Per-day infectiousness of this infection before host-level
    /// modifiers (CD4, interventions, sampling weight).
    #[must_use]
    pub fn infectiousness(&self) -> f64 {
        self.infectiousness
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    #[must_use]
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    #[must_use]
    pub fn recover_fraction(&self) -> f64 {
        self.recover_fraction
    }

    #[must_use]
    pub fn death_fraction(&self) -> f64 {
        self.death_fraction
    }

    /// Advances the infection by one sub-step. At most one structural
    /// transition can occur per call.
    pub fn update(
        &mut self,
        dt: f64,
        frame: &HostFrame,
        rng: &mut IndividualRng,
    ) -> InfectionUpdate {
        self.total_duration += dt;

        let evolved = should_evolve_resistance(
            self.strain,
            self.is_active(),
            frame.drug_effects.clearance_rate,
            frame.drug_effects.resistance_rate,
            dt,
            rng,
        );
        if evolved {
            self.strain = StrainKind::FirstLineResistant;
            self.evolved_resistance = true;
            self.infectiousness *= frame.params.mdr_fitness_multiplier;
            // Drug outcomes are skipped for the sub-step in which resistance
            // emerged, so evolution and a treatment outcome cannot coincide.
            return InfectionUpdate {
                state_change: None,
                evolved_resistance: true,
            };
        }

        let state_change = if frame.drug_effects.is_zero() {
            // Time under an active regimen does not count toward the natural
            // state timer; it resumes where it left off when treatment ends.
            self.duration += dt;
            self.natural_history_update(frame, rng)
        } else {
            self.apply_drug_effects(dt, frame, rng)
        };
        InfectionUpdate {
            state_change,
            evolved_resistance: false,
        }
    }

    /// Resamples the latency timer against a changed activation schedule.
    /// Called when the host's CD4 trajectory shifts (ART start or stop);
    /// only slow latent infections are affected.
    pub fn life_course_latency_update(&mut self, frame: &HostFrame, rng: &mut IndividualRng) {
        if self.state != TbState::Latent || self.fast_progressor {
            return;
        }
        self.duration = 0.0;
        self.sample_latency(frame, rng);
    }

    /// Promotes a slow latent infection to the fast track on exogenous
    /// reinfection. Returns whether anything changed.
    pub fn promote_to_fast(&mut self, frame: &HostFrame, rng: &mut IndividualRng) -> bool {
        if self.state != TbState::Latent || self.fast_progressor {
            return false;
        }
        self.fast_progressor = true;
        self.duration = 0.0;
        self.sample_latency(frame, rng);
        true
    }

    fn natural_history_update(
        &mut self,
        frame: &HostFrame,
        rng: &mut IndividualRng,
    ) -> Option<StateChange> {
        if self.duration < self.state_timer {
            return None;
        }
        match self.state {
            TbState::Latent => {
                if rng.uniform() < self.recover_fraction {
                    Some(StateChange::Cleared)
                } else {
                    self.enter_presymptomatic(frame, rng, false);
                    Some(StateChange::ActivatedPresymptomatic)
                }
            }
            TbState::ActivePresymptomatic => {
                if rng.uniform() < self.recover_fraction {
                    Some(StateChange::Cleared)
                } else {
                    let presentation = self.enter_symptomatic(frame, rng);
                    Some(StateChange::ActivatedSymptomatic(presentation))
                }
            }
            TbState::ActiveSymptomatic => {
                let draw = rng.uniform();
                if draw < self.recover_fraction {
                    Some(StateChange::Cleared)
                } else if draw < self.recover_fraction + self.death_fraction {
                    Some(StateChange::Fatal)
                } else {
                    self.enter_latent(frame, rng);
                    Some(StateChange::Inactivated)
                }
            }
            TbState::PendingRelapse => {
                self.enter_presymptomatic(frame, rng, true);
                Some(StateChange::Relapsed)
            }
        }
    }

    fn apply_drug_effects(
        &mut self,
        dt: f64,
        frame: &HostFrame,
        rng: &mut IndividualRng,
    ) -> Option<StateChange> {
        let effects = &frame.drug_effects;
        match self.state {
            TbState::ActivePresymptomatic | TbState::ActiveSymptomatic => {
                let draw = rng.uniform();
                let mut threshold = effects.clearance_rate * dt;
                if draw < threshold {
                    return Some(StateChange::Cleared);
                }
                threshold += effects.relapse_rate * dt;
                if draw < threshold {
                    self.enter_pending_relapse(frame, rng);
                    return Some(StateChange::ClearedPendingRelapse);
                }
                threshold += effects.inactivation_rate * dt;
                if draw < threshold {
                    self.enter_latent(frame, rng);
                    return Some(StateChange::Inactivated);
                }
                threshold += effects.mortality_rate * dt;
                if draw < threshold {
                    return Some(StateChange::Fatal);
                }
                None
            }
            TbState::Latent => {
                // Treatment of latent infection clears or kills; it cannot
                // produce a relapse or inactivation.
                let draw = rng.uniform();
                if draw < effects.clearance_rate * dt {
                    return Some(StateChange::Cleared);
                }
                if draw < (effects.clearance_rate + effects.mortality_rate) * dt {
                    return Some(StateChange::Fatal);
                }
                None
            }
            TbState::PendingRelapse => {
                // Relapse is deferred while any regimen is active.
                self.state_timer += dt;
                None
            }
        }
    }

    fn enter_latent(&mut self, frame: &HostFrame, rng: &mut IndividualRng) {
        self.state = TbState::Latent;
        self.presentation = None;
        self.duration = 0.0;
        self.death_fraction = 0.0;
        self.infectiousness = 0.0;
        let fast_probability = frame.fast_fraction * frame.primary_progression_multiplier;
        self.fast_progressor = rng.bernoulli(fast_probability.min(1.0));
        self.sample_latency(frame, rng);
    }

    fn sample_latency(&mut self, frame: &HostFrame, rng: &mut IndividualRng) {
        let params = frame.params;
        if self.fast_progressor {
            let total_rate = params.fast_progressor_rate + params.latent_cure_rate;
            self.state_timer = rng.exponential_timer(total_rate);
            self.recover_fraction = fraction_of(params.latent_cure_rate, total_rate);
            return;
        }
        if let Some(schedule) = frame.activation_schedule {
            // Coinfected hosts activate against the CD4-indexed hazard
            // schedule rather than a constant slow rate.
            self.state_timer = rng.piecewise_hazard_timer(
                &schedule.hazards,
                schedule.time_step,
                params.latent_cure_rate,
            );
            let hazard_at_exit = schedule.hazard_at(self.state_timer);
            self.recover_fraction =
                fraction_of(params.latent_cure_rate, params.latent_cure_rate + hazard_at_exit);
            return;
        }
        if params.slow_progressor_rate < 0.0 {
            // Age-dependent activation; no natural recovery on this track.
            self.state_timer = age_dependent_latency(frame.age_years, rng);
            self.recover_fraction = 0.0;
            return;
        }
        let total_rate = params.slow_progressor_rate + params.latent_cure_rate;
        self.state_timer = rng.exponential_timer(total_rate);
        self.recover_fraction = fraction_of(params.latent_cure_rate, total_rate);
    }

    fn enter_presymptomatic(&mut self, frame: &HostFrame, rng: &mut IndividualRng, relapser: bool) {
        let params = frame.params;
        self.state = TbState::ActivePresymptomatic;
        self.presentation = None;
        self.duration = 0.0;
        self.death_fraction = 0.0;
        self.infectiousness =
            params.base_infectivity * params.presymptomatic_infectivity_multiplier;
        if self.strain == StrainKind::FirstLineResistant {
            self.infectiousness *= params.mdr_fitness_multiplier;
        }
        if relapser {
            // Relapsers present immediately and cannot self-cure on the way.
            self.state_timer = 0.0;
            self.recover_fraction = 0.0;
        } else {
            let total_rate = params.presymptomatic_rate + params.presymptomatic_cure_rate;
            self.state_timer = rng.exponential_timer(total_rate);
            self.recover_fraction = fraction_of(params.presymptomatic_cure_rate, total_rate);
        }
    }

    fn enter_symptomatic(&mut self, frame: &HostFrame, rng: &mut IndividualRng) -> Presentation {
        let params = frame.params;
        self.state = TbState::ActiveSymptomatic;
        self.duration = 0.0;

        let draw = rng.uniform();
        let presentation = if draw < frame.smear_positive_fraction {
            Presentation::SmearPositive
        } else if draw < frame.smear_positive_fraction + frame.extrapulmonary_fraction {
            Presentation::Extrapulmonary
        } else {
            Presentation::SmearNegative
        };
        self.presentation = Some(presentation);

        let mortality_rate = params.active_mortality_rate * frame.reduced_mortality;
        let total_rate = params.active_cure_rate + params.inactivation_rate + mortality_rate;
        self.recover_fraction = fraction_of(params.active_cure_rate, total_rate);
        self.death_fraction = fraction_of(mortality_rate, total_rate);

        // Presentation-specific mortality: the freed death mass becomes
        // recovery, keeping the outcome fractions normalized.
        let mortality_multiplier = match presentation {
            Presentation::SmearPositive => 1.0,
            Presentation::SmearNegative => params.smear_negative_mortality_multiplier,
            Presentation::Extrapulmonary => params.extrapulmonary_mortality_multiplier,
        };
        let reweighted_death = self.death_fraction * mortality_multiplier;
        self.recover_fraction += self.death_fraction - reweighted_death;
        self.death_fraction = reweighted_death;

        // The timer is drawn from the pre-reweighting total rate.
        self.state_timer = match params.active_period_distribution {
            ActivePeriodDistribution::Exponential => rng.exponential_timer(total_rate),
            ActivePeriodDistribution::Gaussian => {
                let mean = if total_rate > 0.0 {
                    std::f64::consts::LN_2 / total_rate
                } else {
                    f64::INFINITY
                };
                if mean.is_finite() {
                    rng.gaussian_duration(mean, params.active_period_std_dev)
                } else {
                    f64::INFINITY
                }
            }
        };

        self.infectiousness = params.base_infectivity
            * match presentation {
                Presentation::SmearPositive => 1.0,
                Presentation::SmearNegative => params.smear_negative_infectivity_multiplier,
                Presentation::Extrapulmonary => 0.0,
            };
        if self.strain == StrainKind::FirstLineResistant {
            self.infectiousness *= params.mdr_fitness_multiplier;
        }
        presentation
    }

    fn enter_pending_relapse(&mut self, frame: &HostFrame, rng: &mut IndividualRng) {
        self.state = TbState::PendingRelapse;
        self.presentation = None;
        self.duration = 0.0;
        self.recover_fraction = 0.0;
        self.death_fraction = 0.0;
        self.infectiousness = 0.0;
        self.state_timer = rng.exponential_timer(frame.params.relapsed_to_active_rate);
    }
}

fn fraction_of(rate: f64, total: f64) -> f64 {
    if total > 0.0 {
        rate / total
    } else {
        0.0
    }
}

/// Samples days until activation under the power-law hazard
/// `ALPHA * age_years^(-BETA)` by inverting the cumulative hazard from the
/// host's current age. The cumulative hazard integrates to
/// `ALPHA / (1 - BETA) * age^(1 - BETA)`, which is unbounded, so the draw
/// is always finite.
fn age_dependent_latency(age_years: f64, rng: &mut IndividualRng) -> f64 {
    let age = age_years.max(0.0);
    let exponent = 1.0 - AGE_DEP_BETA;
    let target = -rng.uniform().ln();
    let activation_age = (age.powf(exponent) + exponent / AGE_DEP_ALPHA * target).powf(1.0 / exponent);
    (activation_age - age) * DAYS_PER_YEAR
}
