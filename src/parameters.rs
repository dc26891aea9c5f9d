//! Model configuration.
//!
//! All rates and fractions driving the disease engine live in a single
//! immutable [`Parameters`] value, deserialized from JSON and validated
//! before any individual is created. Simulation code receives it by shared
//! reference (typically `Arc<Parameters>`) and never mutates it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cd4::{ActivationTable, Cd4Map, Cd4Maps};
use crate::error::TbsimError;

/// Age (in years) below which the child presentation fractions apply.
pub const CHILD_AGE_CUTOFF_YEARS: f64 = 15.0;

/// Distribution of the total symptomatic active period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivePeriodDistribution {
    Exponential,
    /// Gaussian with mean `ln(2) / total_rate` and the configured standard
    /// deviation, truncated below at zero.
    Gaussian,
}

/// Natural-history rates for a single TB infection. All rates are per day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfectionParams {
    /// Natural clearance rate while latent.
    pub latent_cure_rate: f64,
    /// Activation rate for fast progressors.
    pub fast_progressor_rate: f64,
    /// Activation rate for slow progressors. A negative value selects the
    /// age-dependent power-law activation model instead of a constant rate.
    pub slow_progressor_rate: f64,
    /// Rate of leaving the presymptomatic state toward symptomatic disease.
    pub presymptomatic_rate: f64,
    /// Natural cure rate while presymptomatic.
    pub presymptomatic_cure_rate: f64,
    /// Natural cure rate while symptomatic.
    pub active_cure_rate: f64,
    /// Rate of reverting from symptomatic disease back to latency.
    pub inactivation_rate: f64,
    /// Untreated TB mortality rate while symptomatic (smear positive).
    pub active_mortality_rate: f64,
    /// Mortality multiplier for extrapulmonary presentation.
    pub extrapulmonary_mortality_multiplier: f64,
    /// Mortality multiplier for smear-negative presentation.
    pub smear_negative_mortality_multiplier: f64,
    /// Infectiousness multiplier while presymptomatic.
    pub presymptomatic_infectivity_multiplier: f64,
    /// Infectiousness multiplier for smear-negative disease.
    pub smear_negative_infectivity_multiplier: f64,
    /// Per-day infectiousness of untreated smear-positive disease.
    pub base_infectivity: f64,
    /// Drug efficacy multiplier against a resistant strain (applied to
    /// clearance and inactivation only).
    pub drug_efficacy_multiplier_mdr: f64,
    /// Drug efficacy multiplier for hosts with a failed treatment history.
    pub drug_efficacy_multiplier_failed: f64,
    /// Drug efficacy multiplier for hosts who have ever relapsed.
    pub drug_efficacy_multiplier_relapsed: f64,
    /// Transmission fitness cost of the resistant strain.
    pub mdr_fitness_multiplier: f64,
    /// Rate of progressing from pending relapse back to active disease.
    pub relapsed_to_active_rate: f64,
    pub active_period_distribution: ActivePeriodDistribution,
    /// Standard deviation of the Gaussian active period, in days.
    pub active_period_std_dev: f64,
}

impl Default for InfectionParams {
    fn default() -> Self {
        InfectionParams {
            latent_cure_rate: 0.0,
            fast_progressor_rate: 0.001,
            slow_progressor_rate: 5.0e-6,
            presymptomatic_rate: 0.03,
            presymptomatic_cure_rate: 0.0,
            active_cure_rate: 0.0004,
            inactivation_rate: 0.0,
            active_mortality_rate: 0.001,
            extrapulmonary_mortality_multiplier: 0.4,
            smear_negative_mortality_multiplier: 0.4,
            presymptomatic_infectivity_multiplier: 0.0,
            smear_negative_infectivity_multiplier: 0.25,
            base_infectivity: 1.0,
            drug_efficacy_multiplier_mdr: 0.0,
            drug_efficacy_multiplier_failed: 1.0,
            drug_efficacy_multiplier_relapsed: 1.0,
            mdr_fitness_multiplier: 1.0,
            relapsed_to_active_rate: 0.1,
            active_period_distribution: ActivePeriodDistribution::Exponential,
            active_period_std_dev: 0.0,
        }
    }
}

/// TB-side host susceptibility configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SusceptibilityParams {
    /// Probability at creation that the host cannot retain acquired
    /// immunity after clearing an infection.
    pub immune_loss_fraction: f64,
    pub fast_progressor_fraction_child: f64,
    pub fast_progressor_fraction_adult: f64,
    pub smear_positive_fraction_child: f64,
    pub smear_positive_fraction_adult: f64,
    pub extrapulmonary_fraction_child: f64,
    pub extrapulmonary_fraction_adult: f64,
    /// Daily probability of losing acquired immunity once the offset has
    /// elapsed, for immune-incompetent hosts with no current infection.
    pub immunity_decay_rate: f64,
    /// Days after the last clearance before immunity can start decaying.
    pub immunity_decay_offset: f64,
    /// Susceptibility retained while carrying acquired immunity.
    pub acquired_immunity_acquisition_multiplier: f64,
}

impl Default for SusceptibilityParams {
    fn default() -> Self {
        SusceptibilityParams {
            immune_loss_fraction: 0.0,
            fast_progressor_fraction_child: 0.1,
            fast_progressor_fraction_adult: 0.05,
            smear_positive_fraction_child: 0.3,
            smear_positive_fraction_adult: 0.65,
            extrapulmonary_fraction_child: 0.3,
            extrapulmonary_fraction_adult: 0.1,
            immunity_decay_rate: 0.0,
            immunity_decay_offset: 0.0,
            acquired_immunity_acquisition_multiplier: 0.5,
        }
    }
}

/// CD4-indexed coinfection configuration. The three multiplier tables are
/// parallel to `cd4_strata`; the activation table is parallel to
/// `activation_cd4_strata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinfectionParams {
    /// CD4 breakpoints (ascending) for the multiplier maps.
    pub cd4_strata: Vec<f64>,
    pub cd4_infectiousness_multipliers: Vec<f64>,
    pub cd4_susceptibility_multipliers: Vec<f64>,
    pub cd4_primary_progression_multipliers: Vec<f64>,
    /// CD4 breakpoints (ascending) for the activation hazard table.
    pub activation_cd4_strata: Vec<f64>,
    /// Daily latent-activation hazard per activation stratum.
    pub activation_hazards: Vec<f64>,
    /// Extra multiplicative reduction of the activation hazard while on ART.
    pub art_extra_reactivation_reduction: f64,
    /// Excess daily mortality for untreated symptomatic TB with HIV.
    pub coinfection_mortality_rate_off_art: f64,
    pub coinfection_mortality_rate_on_art: f64,
    /// Spacing (days) of the forward CD4 projection used to build
    /// activation schedules.
    pub cd4_time_step: f64,
    /// Number of steps in the forward CD4 projection.
    pub cd4_num_steps: usize,
    /// CD4 count shortly after HIV infection.
    pub cd4_post_infection: f64,
    /// CD4 count at the end of the untreated prognosis.
    pub cd4_at_death: f64,
    /// Untreated survival from HIV infection, in days.
    pub hiv_prognosis_days: f64,
}

impl Default for CoinfectionParams {
    fn default() -> Self {
        CoinfectionParams {
            cd4_strata: vec![0.0, 200.0, 350.0, 500.0],
            cd4_infectiousness_multipliers: vec![0.3, 0.5, 0.8, 1.0],
            cd4_susceptibility_multipliers: vec![5.0, 3.0, 2.0, 1.0],
            cd4_primary_progression_multipliers: vec![5.0, 3.0, 2.0, 1.0],
            activation_cd4_strata: vec![0.0, 200.0, 350.0, 500.0],
            activation_hazards: vec![2.0e-4, 1.0e-4, 5.0e-5, 2.0e-5],
            art_extra_reactivation_reduction: 1.0,
            coinfection_mortality_rate_off_art: 0.0,
            coinfection_mortality_rate_on_art: 0.0,
            cd4_time_step: 30.0,
            cd4_num_steps: 120,
            cd4_post_infection: 550.0,
            cd4_at_death: 50.0,
            hiv_prognosis_days: 4000.0,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Seed for all per-individual random streams.
    pub base_seed: u64,
    /// Outer time step, in days.
    pub time_step: f64,
    /// Number of infection sub-steps per outer time step.
    pub infection_updates_per_step: u32,
    /// Enables the zero-dt exogenous reinfection path for latent-slow hosts.
    pub enable_exogenous_reinfection: bool,
    pub infection: InfectionParams,
    pub susceptibility: SusceptibilityParams,
    pub coinfection: CoinfectionParams,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            base_seed: 0,
            time_step: 1.0,
            infection_updates_per_step: 1,
            enable_exogenous_reinfection: false,
            infection: InfectionParams::default(),
            susceptibility: SusceptibilityParams::default(),
            coinfection: CoinfectionParams::default(),
        }
    }
}

impl Parameters {
    /// Loads parameters from a JSON file and validates them.
    ///
    /// # Errors
    ///
    /// Returns `TbsimError` if the file cannot be read, fails to parse, or
    /// fails validation.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Parameters, TbsimError> {
        let contents = fs::read_to_string(path)?;
        let parameters: Parameters = serde_json::from_str(&contents)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Checks the configuration for internal consistency. Any violation is a
    /// configuration bug and must stop the run before simulation starts.
    ///
    /// # Errors
    ///
    /// Returns `TbsimError` describing the first violation found.
    pub fn validate(&self) -> Result<(), TbsimError> {
        if self.time_step <= 0.0 {
            return Err(TbsimError::from("time_step must be positive"));
        }
        if self.infection_updates_per_step == 0 {
            return Err(TbsimError::from(
                "infection_updates_per_step must be at least 1",
            ));
        }

        let s = &self.susceptibility;
        for (label, smear, extrapulm) in [
            (
                "child",
                s.smear_positive_fraction_child,
                s.extrapulmonary_fraction_child,
            ),
            (
                "adult",
                s.smear_positive_fraction_adult,
                s.extrapulmonary_fraction_adult,
            ),
        ] {
            check_fraction(smear, "smear-positive fraction")?;
            check_fraction(extrapulm, "extrapulmonary fraction")?;
            if smear + extrapulm > 1.0 {
                return Err(TbsimError::from(format!(
                    "{label} smear-positive and extrapulmonary fractions sum to {} (> 1)",
                    smear + extrapulm
                )));
            }
        }
        check_fraction(s.immune_loss_fraction, "immune_loss_fraction")?;
        check_fraction(s.fast_progressor_fraction_child, "fast progressor fraction")?;
        check_fraction(s.fast_progressor_fraction_adult, "fast progressor fraction")?;

        let c = &self.coinfection;
        for (name, values) in [
            ("cd4_infectiousness_multipliers", &c.cd4_infectiousness_multipliers),
            ("cd4_susceptibility_multipliers", &c.cd4_susceptibility_multipliers),
            (
                "cd4_primary_progression_multipliers",
                &c.cd4_primary_progression_multipliers,
            ),
        ] {
            if values.len() != c.cd4_strata.len() {
                return Err(TbsimError::from(format!(
                    "{name} has {} entries but cd4_strata has {}",
                    values.len(),
                    c.cd4_strata.len()
                )));
            }
        }
        if c.activation_hazards.len() != c.activation_cd4_strata.len() {
            return Err(TbsimError::from(format!(
                "activation_hazards has {} entries but activation_cd4_strata has {}",
                c.activation_hazards.len(),
                c.activation_cd4_strata.len()
            )));
        }
        check_sorted(&c.cd4_strata, "cd4_strata")?;
        check_sorted(&c.activation_cd4_strata, "activation_cd4_strata")?;
        if c.cd4_time_step <= 0.0 {
            return Err(TbsimError::from("cd4_time_step must be positive"));
        }
        if c.cd4_num_steps == 0 {
            return Err(TbsimError::from("cd4_num_steps must be at least 1"));
        }
        if c.hiv_prognosis_days <= 0.0 {
            return Err(TbsimError::from("hiv_prognosis_days must be positive"));
        }

        let i = &self.infection;
        for (name, rate) in [
            ("latent_cure_rate", i.latent_cure_rate),
            ("fast_progressor_rate", i.fast_progressor_rate),
            ("presymptomatic_rate", i.presymptomatic_rate),
            ("presymptomatic_cure_rate", i.presymptomatic_cure_rate),
            ("active_cure_rate", i.active_cure_rate),
            ("inactivation_rate", i.inactivation_rate),
            ("active_mortality_rate", i.active_mortality_rate),
            ("relapsed_to_active_rate", i.relapsed_to_active_rate),
            ("active_period_std_dev", i.active_period_std_dev),
        ] {
            if rate < 0.0 {
                return Err(TbsimError::from(format!("{name} must be non-negative")));
            }
        }
        Ok(())
    }

    /// Builds the CD4 multiplier maps from the configured parallel arrays.
    ///
    /// # Errors
    ///
    /// Returns `TbsimError` if any parallel-array pair is inconsistent;
    /// unreachable after `validate()` has passed.
    pub fn cd4_maps(&self) -> Result<Cd4Maps, TbsimError> {
        let c = &self.coinfection;
        Ok(Cd4Maps {
            infectiousness: Cd4Map::from_parallel(
                &c.cd4_strata,
                &c.cd4_infectiousness_multipliers,
            )?,
            susceptibility: Cd4Map::from_parallel(
                &c.cd4_strata,
                &c.cd4_susceptibility_multipliers,
            )?,
            primary_progression: Cd4Map::from_parallel(
                &c.cd4_strata,
                &c.cd4_primary_progression_multipliers,
            )?,
            activation: ActivationTable::from_parallel(
                &c.activation_cd4_strata,
                &c.activation_hazards,
            )?,
        })
    }
}

fn check_fraction(value: f64, name: &str) -> Result<(), TbsimError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(TbsimError::from(format!("{name} must be in [0, 1], got {value}")));
    }
    Ok(())
}

fn check_sorted(values: &[f64], name: &str) -> Result<(), TbsimError> {
    if values.windows(2).any(|w| w[0] >= w[1]) {
        return Err(TbsimError::from(format!(
            "{name} must be strictly increasing"
        )));
    }
    Ok(())
}
