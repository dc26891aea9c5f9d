//! The host: owns its TB infections, HIV record, immunology, interventions,
//! and random stream, and drives them through the update/expose contract.

use serde::{Deserialize, Serialize};

use crate::cd4::{ActivationSchedule, Cd4Maps};
use crate::drugs::{aggregate_drug_effects, TbDrug};
use crate::events::DiseaseEvent;
use crate::hiv::{HivInfection, HivSusceptibility, HEALTHY_CD4};
use crate::infection::{HostFrame, Infection, StateChange, TbState};
use crate::interventions::InterventionContainer;
use crate::log::trace;
use crate::parameters::Parameters;
use crate::random::{IndividualRng, NATURAL_HISTORY_STREAM};
use crate::strain::StrainKind;
use crate::susceptibility::{
    extrapulmonary_fraction, fast_fraction, smear_positive_fraction, TbSusceptibility,
};
use crate::transmission::{ContagionPool, ContagionSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndividualId(pub u64);

impl std::fmt::Display for IndividualId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    id: IndividualId,
    age_years: f64,
    /// Sampling weight applied to deposited infectiousness.
    mc_weight: f64,
    base_seed: u64,
    alive: bool,
    tb_infections: Vec<Infection>,
    hiv_infection: Option<HivInfection>,
    tb_susceptibility: Option<TbSusceptibility>,
    hiv_susceptibility: Option<HivSusceptibility>,
    interventions: InterventionContainer,
    /// Forward activation hazards; present only for coinfected hosts.
    activation_schedule: Option<ActivationSchedule>,
    /// Events produced since the last drain.
    events: Vec<DiseaseEvent>,
    /// Serialized as its stream position only; see [`Individual::reseed`].
    rng: IndividualRng,
}

impl Individual {
    #[must_use]
    pub fn new(id: IndividualId, age_years: f64, mc_weight: f64, params: &Parameters) -> Individual {
        Individual {
            id,
            age_years,
            mc_weight,
            base_seed: params.base_seed,
            alive: true,
            tb_infections: Vec::new(),
            hiv_infection: None,
            tb_susceptibility: None,
            hiv_susceptibility: None,
            interventions: InterventionContainer::default(),
            activation_schedule: None,
            events: Vec::new(),
            rng: IndividualRng::new(params.base_seed, NATURAL_HISTORY_STREAM, id.0),
        }
    }

    /// Rebuilds the random stream after checkpoint restore and replays it
    /// to the persisted position, so a resumed run draws exactly what an
    /// uninterrupted run would have.
    pub fn reseed(&mut self) {
        let draws = self.rng.draws();
        self.rng = IndividualRng::new(self.base_seed, NATURAL_HISTORY_STREAM, self.id.0);
        self.rng.fast_forward(draws);
    }

    #[must_use]
    pub fn id(&self) -> IndividualId {
        self.id
    }

    #[must_use]
    pub fn age_years(&self) -> f64 {
        self.age_years
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    #[must_use]
    pub fn tb_infections(&self) -> &[Infection] {
        &self.tb_infections
    }

    #[must_use]
    pub fn hiv_infection(&self) -> Option<&HivInfection> {
        self.hiv_infection.as_ref()
    }

    #[must_use]
    pub fn tb_susceptibility(&self) -> Option<&TbSusceptibility> {
        self.tb_susceptibility.as_ref()
    }

    #[must_use]
    pub fn interventions(&self) -> &InterventionContainer {
        &self.interventions
    }

    #[must_use]
    pub fn interventions_mut(&mut self) -> &mut InterventionContainer {
        &mut self.interventions
    }

    /// The host's CD4 count, or the healthy sentinel for HIV-negative
    /// hosts.
    #[must_use]
    pub fn cd4(&self) -> f64 {
        self.hiv_susceptibility
            .as_ref()
            .map_or(HEALTHY_CD4, HivSusceptibility::cd4_count)
    }

    /// Drains the accumulated disease events.
    pub fn drain_events(&mut self) -> Vec<DiseaseEvent> {
        std::mem::take(&mut self.events)
    }

    /// Initializes TB immunology for this host. Must precede any TB
    /// acquisition.
    pub fn create_susceptibility(
        &mut self,
        immune_modifier: f64,
        risk_modifier: f64,
        params: &Parameters,
    ) {
        self.tb_susceptibility = Some(TbSusceptibility::new(
            immune_modifier,
            risk_modifier,
            &params.susceptibility,
            &mut self.rng,
        ));
    }

    /// Seeds a new latent TB infection of the given strain.
    ///
    /// # Panics
    ///
    /// Panics if TB immunology has not been initialized; acquiring an
    /// infection without it is a program bug.
    pub fn acquire_tb_infection(&mut self, strain: StrainKind, params: &Parameters, maps: &Cd4Maps) {
        assert!(
            self.tb_susceptibility.is_some(),
            "individual {} acquired TB before immunology was initialized",
            self.id
        );
        let frame = self.frame(strain, params, maps, self.activation_schedule.as_ref());
        let infection = Infection::new_latent(strain, &frame, &mut self.rng);
        let fast = infection.is_fast_progressor();
        self.tb_infections.push(infection);
        if let Some(susceptibility) = self.tb_susceptibility.as_mut() {
            susceptibility.init_new_infection();
        }
        self.events.push(if fast {
            DiseaseEvent::LatentFast
        } else {
            DiseaseEvent::LatentSlow
        });
        if strain == StrainKind::FirstLineResistant {
            self.events.push(DiseaseEvent::ResistantAcquisition);
        }
        trace!("individual {} acquired latent TB (fast: {fast})", self.id);
    }

    /// Seeds an HIV infection and builds the activation schedule.
    pub fn acquire_hiv_infection(&mut self, params: &Parameters, maps: &Cd4Maps) {
        self.hiv_infection = Some(HivInfection::new(params.coinfection.hiv_prognosis_days));
        self.hiv_susceptibility = Some(HivSusceptibility::new(&params.coinfection));
        self.recompute_activation_schedule(params, maps);
    }

    /// Hands the host a TB drug regimen.
    pub fn give_tb_drug(&mut self, drug: TbDrug) {
        self.interventions.tb.give_drug(drug, &mut self.events);
    }

    /// Starts ART, shifting the CD4 trajectory and resampling latency
    /// timers against the new activation schedule.
    pub fn start_art(&mut self, params: &Parameters, maps: &Cd4Maps) {
        if !self.interventions.hiv.start_art(&mut self.events) {
            return;
        }
        if let Some(hiv) = self.hiv_susceptibility.as_mut() {
            hiv.start_art();
        }
        self.recompute_activation_schedule(params, maps);
    }

    /// Stops ART; the CD4 decline resumes and latency timers are resampled.
    pub fn stop_art(&mut self, params: &Parameters, maps: &Cd4Maps) {
        if !self.interventions.hiv.stop_art(&mut self.events) {
            return;
        }
        if let Some(hiv) = self.hiv_susceptibility.as_mut() {
            hiv.stop_art();
        }
        self.recompute_activation_schedule(params, maps);
    }

    /// Rebuilds the cached activation schedule from the current CD4
    /// trajectory and pushes it into slow latent infections.
    fn recompute_activation_schedule(&mut self, params: &Parameters, maps: &Cd4Maps) {
        let Some(hiv) = self.hiv_susceptibility.as_ref() else {
            self.activation_schedule = None;
            return;
        };
        let trajectory = hiv.forward_cd4(
            params.coinfection.cd4_num_steps,
            params.coinfection.cd4_time_step,
        );
        let modifier = if self.interventions.hiv.on_art() {
            params.coinfection.art_extra_reactivation_reduction
        } else {
            1.0
        };
        let schedule = ActivationSchedule::from_trajectory(
            &maps.activation,
            &trajectory,
            params.coinfection.cd4_time_step,
            modifier,
        );
        let primary_progression_multiplier = maps.primary_progression.multiplier(self.cd4());
        for infection in &mut self.tb_infections {
            let frame = HostFrame {
                params: &params.infection,
                age_years: self.age_years,
                primary_progression_multiplier,
                activation_schedule: Some(&schedule),
                drug_effects: aggregate_drug_effects(
                    self.interventions.tb.active_drugs(),
                    infection.strain(),
                    self.interventions.tb.history(),
                    &params.infection,
                ),
                reduced_mortality: self.interventions.reduced_mortality(),
                fast_fraction: fast_fraction(&params.susceptibility, self.age_years),
                smear_positive_fraction: smear_positive_fraction(
                    &params.susceptibility,
                    self.age_years,
                ),
                extrapulmonary_fraction: extrapulmonary_fraction(
                    &params.susceptibility,
                    self.age_years,
                ),
            };
            infection.life_course_latency_update(&frame, &mut self.rng);
        }
        self.activation_schedule = Some(schedule);
    }

    fn frame<'a>(
        &self,
        strain: StrainKind,
        params: &'a Parameters,
        maps: &Cd4Maps,
        schedule: Option<&'a ActivationSchedule>,
    ) -> HostFrame<'a> {
        HostFrame {
            params: &params.infection,
            age_years: self.age_years,
            primary_progression_multiplier: maps.primary_progression.multiplier(self.cd4()),
            activation_schedule: schedule,
            drug_effects: aggregate_drug_effects(
                self.interventions.tb.active_drugs(),
                strain,
                self.interventions.tb.history(),
                &params.infection,
            ),
            reduced_mortality: self.interventions.reduced_mortality(),
            fast_fraction: fast_fraction(&params.susceptibility, self.age_years),
            smear_positive_fraction: smear_positive_fraction(&params.susceptibility, self.age_years),
            extrapulmonary_fraction: extrapulmonary_fraction(&params.susceptibility, self.age_years),
        }
    }

    #[must_use]
    fn has_untreated_symptomatic_tb(&self) -> bool {
        !self.interventions.tb.on_treatment()
            && self.tb_infections.iter().any(Infection::is_symptomatic)
    }

    /// Advances the host by one outer time step: sub-stepped infection and
    /// immunity updates, intervention bookkeeping, the coinfection
    /// mortality draw, and the infectiousness deposit.
    pub fn update(&mut self, params: &Parameters, maps: &Cd4Maps, pool: &ContagionPool) {
        if !self.alive {
            return;
        }
        let dt = params.time_step;
        let sub_dt = dt / f64::from(params.infection_updates_per_step);

        'sub_steps: for _ in 0..params.infection_updates_per_step {
            if let Some(hiv) = self.hiv_infection.as_mut() {
                hiv.update(sub_dt);
            }
            if let Some(hiv) = self.hiv_susceptibility.as_mut() {
                hiv.update(sub_dt);
            }

            let age_years = self.age_years;
            let primary_progression_multiplier = maps.primary_progression.multiplier(self.cd4());
            let mut index = 0;
            while index < self.tb_infections.len() {
                let strain = self.tb_infections[index].strain();
                let frame = HostFrame {
                    params: &params.infection,
                    age_years,
                    primary_progression_multiplier,
                    activation_schedule: self.activation_schedule.as_ref(),
                    drug_effects: aggregate_drug_effects(
                        self.interventions.tb.active_drugs(),
                        strain,
                        self.interventions.tb.history(),
                        &params.infection,
                    ),
                    reduced_mortality: self.interventions.reduced_mortality(),
                    fast_fraction: fast_fraction(&params.susceptibility, age_years),
                    smear_positive_fraction: smear_positive_fraction(
                        &params.susceptibility,
                        age_years,
                    ),
                    extrapulmonary_fraction: extrapulmonary_fraction(
                        &params.susceptibility,
                        age_years,
                    ),
                };
                let update = self.tb_infections[index].update(sub_dt, &frame, &mut self.rng);
                if update.evolved_resistance {
                    self.events.push(DiseaseEvent::EvolvedResistance);
                }
                match update.state_change {
                    Some(StateChange::ActivatedPresymptomatic) => {
                        self.events.push(DiseaseEvent::ActivationPresymptomatic);
                    }
                    Some(StateChange::ActivatedSymptomatic(presentation)) => {
                        self.events.push(match presentation {
                            crate::infection::Presentation::SmearPositive => {
                                DiseaseEvent::ActivationSmearPositive
                            }
                            crate::infection::Presentation::SmearNegative => {
                                DiseaseEvent::ActivationSmearNegative
                            }
                            crate::infection::Presentation::Extrapulmonary => {
                                DiseaseEvent::ActivationExtrapulmonary
                            }
                        });
                    }
                    Some(StateChange::Inactivated) => {
                        self.events.push(DiseaseEvent::Inactivation);
                    }
                    Some(StateChange::Relapsed) => {
                        self.events.push(DiseaseEvent::Relapse);
                        self.interventions.tb.mark_relapsed(&mut self.events);
                    }
                    Some(StateChange::Cleared) => {
                        self.events.push(DiseaseEvent::Cleared);
                        self.tb_infections.remove(index);
                        if let Some(susceptibility) = self.tb_susceptibility.as_mut() {
                            susceptibility.infection_cleared(&params.susceptibility);
                        }
                        continue;
                    }
                    Some(StateChange::ClearedPendingRelapse) => {
                        self.events.push(DiseaseEvent::ClearedPendingRelapse);
                    }
                    Some(StateChange::Fatal) => {
                        self.events.push(DiseaseEvent::TbDeath);
                        self.alive = false;
                        break 'sub_steps;
                    }
                    None => {}
                }
                index += 1;
            }

            if let Some(susceptibility) = self.tb_susceptibility.as_mut() {
                susceptibility.update(sub_dt, &params.susceptibility, &mut self.rng);
            }
            let symptomatic = self.tb_infections.iter().any(Infection::is_symptomatic);
            self.interventions
                .tb
                .infectious_loop_update(sub_dt, symptomatic, &mut self.events);
        }

        if !self.alive {
            return;
        }

        // Untreated active symptomatic TB with HIV carries excess mortality.
        if self.hiv_infection.is_some() && self.has_untreated_symptomatic_tb() {
            let rate = if self.interventions.hiv.on_art() {
                params.coinfection.coinfection_mortality_rate_on_art
            } else {
                params.coinfection.coinfection_mortality_rate_off_art
            };
            if rate > 0.0 && self.rng.bernoulli(1.0 - (-rate * dt).exp()) {
                self.events.push(DiseaseEvent::HivCoinfectionDeath);
                self.alive = false;
                return;
            }
        }

        self.deposit_infectiousness(maps, pool);
    }

    /// Deposits this host's infectiousness into the contagion pool,
    /// applying the CD4, intervention, risk, and sampling-weight modifiers.
    fn deposit_infectiousness(&self, maps: &Cd4Maps, pool: &ContagionPool) {
        let cd4_modifier = maps.infectiousness.multiplier(self.cd4());
        let risk_modifier = self
            .tb_susceptibility
            .as_ref()
            .map_or(1.0, TbSusceptibility::transmit_modifier);
        let host_modifier =
            cd4_modifier * risk_modifier * self.interventions.reduced_transmit() * self.mc_weight;
        for infection in &self.tb_infections {
            pool.deposit(infection.strain(), infection.infectiousness() * host_modifier);
        }
    }

    /// Exposes the host to the contagion snapshot over `dt` days. A zero
    /// `dt` selects the exogenous reinfection path, which promotes slow
    /// latent infections to the fast track instead of seeding a new one.
    ///
    /// # Panics
    ///
    /// Panics on an acquisition attempt before TB immunology was
    /// initialized.
    pub fn expose(
        &mut self,
        snapshot: &ContagionSnapshot,
        dt: f64,
        params: &Parameters,
        maps: &Cd4Maps,
    ) {
        if !self.alive || snapshot.total() <= 0.0 {
            return;
        }
        if dt == 0.0 {
            self.expose_exogenous(snapshot, params, maps);
            return;
        }
        let Some(susceptibility) = self.tb_susceptibility.as_ref() else {
            panic!(
                "individual {} exposed before TB immunology was initialized",
                self.id
            );
        };
        let modifier = susceptibility.acquisition_multiplier(&params.susceptibility)
            * maps.susceptibility.multiplier(self.cd4())
            * self.interventions.reduced_acquire();
        let probability = 1.0 - (-snapshot.total() * dt * modifier).exp();
        if !self.rng.bernoulli(probability) {
            return;
        }
        if let Some(strain) = snapshot.resolve_strain(&mut self.rng) {
            self.acquire_tb_infection(strain, params, maps);
        }
    }

    /// The exogenous path: an already-infected host re-exposed to enough
    /// contagion has its slow latency promoted to the fast track.
    fn expose_exogenous(
        &mut self,
        snapshot: &ContagionSnapshot,
        params: &Parameters,
        maps: &Cd4Maps,
    ) {
        if !params.enable_exogenous_reinfection {
            return;
        }
        let has_slow_latent = self.tb_infections.iter().any(|infection| {
            infection.state() == TbState::Latent && !infection.is_fast_progressor()
        });
        if !has_slow_latent {
            return;
        }
        let Some(susceptibility) = self.tb_susceptibility.as_ref() else {
            return;
        };
        let modifier = susceptibility.acquisition_multiplier(&params.susceptibility)
            * maps.susceptibility.multiplier(self.cd4())
            * self.interventions.reduced_acquire();
        // The outer time step stands in for the exposure window.
        let probability = 1.0 - (-snapshot.total() * params.time_step * modifier).exp();
        if !self.rng.bernoulli(probability) {
            return;
        }
        let frame = self.frame(
            StrainKind::DrugSensitive,
            params,
            maps,
            self.activation_schedule.as_ref(),
        );
        let mut promoted = false;
        for infection in &mut self.tb_infections {
            if infection.promote_to_fast(&frame, &mut self.rng) {
                promoted = true;
            }
        }
        if promoted {
            self.events.push(DiseaseEvent::ExogenousFastProgression);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drugs::DrugEffects;

    fn params() -> Parameters {
        let mut params = Parameters::default();
        params.base_seed = 42;
        params.infection.fast_progressor_rate = 0.01;
        params.validate().unwrap();
        params
    }

    fn setup(id: u64, params: &Parameters) -> (Individual, Cd4Maps) {
        let maps = params.cd4_maps().unwrap();
        let mut individual = Individual::new(IndividualId(id), 30.0, 1.0, params);
        individual.create_susceptibility(1.0, 1.0, params);
        (individual, maps)
    }

    #[test]
    #[should_panic(expected = "before immunology was initialized")]
    fn acquisition_without_immunology_panics() {
        let params = params();
        let maps = params.cd4_maps().unwrap();
        let mut individual = Individual::new(IndividualId(0), 30.0, 1.0, &params);
        individual.acquire_tb_infection(StrainKind::DrugSensitive, &params, &maps);
    }

    #[test]
    fn acquisition_records_latency_track() {
        let params = params();
        let (mut individual, maps) = setup(1, &params);
        individual.acquire_tb_infection(StrainKind::DrugSensitive, &params, &maps);
        let events = individual.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            DiseaseEvent::LatentFast | DiseaseEvent::LatentSlow
        ));
        assert_eq!(individual.tb_infections().len(), 1);
        assert_eq!(
            individual.tb_susceptibility().unwrap().infection_count(),
            1
        );
    }

    #[test]
    fn resistant_acquisition_emits_its_event() {
        let params = params();
        let (mut individual, maps) = setup(2, &params);
        individual.acquire_tb_infection(StrainKind::FirstLineResistant, &params, &maps);
        let events = individual.drain_events();
        assert!(events.contains(&DiseaseEvent::ResistantAcquisition));
    }

    #[test]
    fn healthy_host_reports_sentinel_cd4() {
        let params = params();
        let (individual, _maps) = setup(3, &params);
        assert!((individual.cd4() - HEALTHY_CD4).abs() < f64::EPSILON);
    }

    #[test]
    fn hiv_acquisition_builds_activation_schedule() {
        let params = params();
        let (mut individual, maps) = setup(4, &params);
        assert!(individual.activation_schedule.is_none());
        individual.acquire_hiv_infection(&params, &maps);
        let schedule = individual.activation_schedule.as_ref().unwrap();
        assert_eq!(schedule.hazards.len(), params.coinfection.cd4_num_steps);
        assert!(individual.cd4() < HEALTHY_CD4);
    }

    #[test]
    fn art_cycle_rebuilds_schedule_with_reduction() {
        let mut params = params();
        params.coinfection.art_extra_reactivation_reduction = 0.25;
        let (mut individual, maps) = setup(5, &params);
        individual.acquire_hiv_infection(&params, &maps);
        let off_art = individual.activation_schedule.clone().unwrap();

        individual.start_art(&params, &maps);
        let on_art = individual.activation_schedule.clone().unwrap();
        // Same CD4 at time zero, so the first hazard shows the pure ART
        // reduction.
        assert!((on_art.hazards[0] - off_art.hazards[0] * 0.25).abs() < 1e-12);

        individual.stop_art(&params, &maps);
        let events = individual.drain_events();
        assert!(events.contains(&DiseaseEvent::ArtStarted));
        assert!(events.contains(&DiseaseEvent::ArtStopped));
    }

    #[test]
    fn update_removes_cleared_infections() {
        let mut params = params();
        // Clearance-only treatment with certainty within one step.
        params.infection.latent_cure_rate = 0.0;
        let (mut individual, maps) = setup(6, &params);
        individual.acquire_tb_infection(StrainKind::DrugSensitive, &params, &maps);
        individual.give_tb_drug(TbDrug {
            effects: DrugEffects {
                clearance_rate: 100.0,
                ..DrugEffects::default()
            },
            remaining_days: 365.0,
        });
        let pool = ContagionPool::new();
        individual.update(&params, &maps, &pool);
        assert!(individual.tb_infections().is_empty());
        let events = individual.drain_events();
        assert!(events.contains(&DiseaseEvent::Cleared));
        assert_eq!(
            individual.tb_susceptibility().unwrap().infection_count(),
            0
        );
        assert!(individual
            .tb_susceptibility()
            .unwrap()
            .has_acquired_immunity());
    }

    #[test]
    fn dead_hosts_do_not_update() {
        let params = params();
        let (mut individual, maps) = setup(7, &params);
        individual.alive = false;
        let pool = ContagionPool::new();
        individual.update(&params, &maps, &pool);
        assert!(individual.drain_events().is_empty());
    }

    #[test]
    fn exposure_with_empty_pool_is_inert() {
        let params = params();
        let (mut individual, maps) = setup(8, &params);
        let snapshot = ContagionSnapshot::default();
        individual.expose(&snapshot, 1.0, &params, &maps);
        assert!(individual.tb_infections().is_empty());
    }

    #[test]
    fn overwhelming_exposure_always_infects() {
        let params = params();
        let (mut individual, maps) = setup(9, &params);
        let snapshot = ContagionSnapshot {
            sensitive: 1.0e9,
            resistant: 0.0,
        };
        individual.expose(&snapshot, 1.0, &params, &maps);
        assert_eq!(individual.tb_infections().len(), 1);
        assert_eq!(
            individual.tb_infections()[0].strain(),
            StrainKind::DrugSensitive
        );
    }

    #[test]
    fn exogenous_path_requires_the_flag() {
        let mut params = params();
        params.susceptibility.fast_progressor_fraction_adult = 0.0;
        let (mut individual, maps) = setup(10, &params);
        individual.acquire_tb_infection(StrainKind::DrugSensitive, &params, &maps);
        individual.drain_events();
        let snapshot = ContagionSnapshot {
            sensitive: 1.0e9,
            resistant: 0.0,
        };
        individual.expose(&snapshot, 0.0, &params, &maps);
        assert!(individual.drain_events().is_empty());

        params.enable_exogenous_reinfection = true;
        individual.expose(&snapshot, 0.0, &params, &maps);
        let events = individual.drain_events();
        assert_eq!(events, vec![DiseaseEvent::ExogenousFastProgression]);
        assert!(individual.tb_infections()[0].is_fast_progressor());
        // No second infection was seeded
        assert_eq!(individual.tb_infections().len(), 1);
    }

    #[test]
    fn deposits_scale_with_weight_and_modifiers() {
        let mut params = params();
        // Force immediate fast activation to get a symptomatic case.
        params.susceptibility.fast_progressor_fraction_adult = 1.0;
        params.susceptibility.smear_positive_fraction_adult = 1.0;
        params.susceptibility.extrapulmonary_fraction_adult = 0.0;
        params.infection.fast_progressor_rate = 1.0e6;
        params.infection.presymptomatic_rate = 1.0e6;
        params.infection.latent_cure_rate = 0.0;
        params.infection.presymptomatic_cure_rate = 0.0;
        let maps = params.cd4_maps().unwrap();
        let mut individual = Individual::new(IndividualId(11), 30.0, 2.0, &params);
        individual.create_susceptibility(1.0, 0.5, &params);
        individual.acquire_tb_infection(StrainKind::DrugSensitive, &params, &maps);
        let pool = ContagionPool::new();
        // Two steps: latent -> presymptomatic, presymptomatic -> symptomatic.
        individual.update(&params, &maps, &pool);
        individual.update(&params, &maps, &pool);
        assert!(individual.tb_infections()[0].is_symptomatic());
        pool.reset();
        individual.update(&params, &maps, &pool);
        // weight 2.0 x risk modifier 0.5 cancel out
        let expected = params.infection.base_infectivity;
        assert!((pool.total(StrainKind::DrugSensitive) - expected).abs() < 1e-9);
    }

    #[test]
    fn coinfection_mortality_only_off_treatment() {
        let mut params = params();
        params.coinfection.coinfection_mortality_rate_off_art = 1.0e6;
        params.susceptibility.fast_progressor_fraction_adult = 1.0;
        params.infection.fast_progressor_rate = 1.0e6;
        params.infection.presymptomatic_rate = 1.0e6;
        params.infection.latent_cure_rate = 0.0;
        params.infection.presymptomatic_cure_rate = 0.0;
        let (mut individual, maps) = setup(12, &params);
        individual.acquire_hiv_infection(&params, &maps);
        individual.acquire_tb_infection(StrainKind::DrugSensitive, &params, &maps);
        let pool = ContagionPool::new();
        individual.update(&params, &maps, &pool);
        individual.update(&params, &maps, &pool);
        assert!(individual.tb_infections()[0].is_symptomatic());
        individual.update(&params, &maps, &pool);
        assert!(!individual.is_alive());
        assert!(individual
            .drain_events()
            .contains(&DiseaseEvent::HivCoinfectionDeath));
    }

    #[test]
    fn fixed_seed_reproduces_event_stream() {
        let mut params = params();
        params.susceptibility.fast_progressor_fraction_adult = 0.5;
        let maps = params.cd4_maps().unwrap();
        let run = || {
            let mut individual = Individual::new(IndividualId(13), 30.0, 1.0, &params);
            individual.create_susceptibility(1.0, 1.0, &params);
            individual.acquire_tb_infection(StrainKind::DrugSensitive, &params, &maps);
            let pool = ContagionPool::new();
            let mut all_events = Vec::new();
            for _ in 0..2000 {
                individual.update(&params, &maps, &pool);
                all_events.extend(individual.drain_events());
                if !individual.is_alive() {
                    break;
                }
            }
            all_events
        };
        assert_eq!(run(), run());
    }
}
