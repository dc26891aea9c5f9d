//! End-to-end tests of the disease engine over whole individuals.

use std::io::Write;

use tbsim::cd4::Cd4Map;
use tbsim::drugs::{DrugEffects, TbDrug};
use tbsim::events::DiseaseEvent;
use tbsim::individual::{Individual, IndividualId};
use tbsim::parameters::Parameters;
use tbsim::strain::StrainKind;
use tbsim::transmission::ContagionPool;

fn base_params(seed: u64) -> Parameters {
    let mut params = Parameters::default();
    params.base_seed = seed;
    params
}

/// Forces near-immediate progression latent -> presymptomatic -> symptomatic.
fn fast_activation(params: &mut Parameters) {
    params.susceptibility.fast_progressor_fraction_adult = 1.0;
    params.infection.fast_progressor_rate = 1.0e6;
    params.infection.presymptomatic_rate = 1.0e6;
    params.infection.latent_cure_rate = 0.0;
    params.infection.presymptomatic_cure_rate = 0.0;
}

fn infected_individual(id: u64, params: &Parameters) -> (Individual, tbsim::cd4::Cd4Maps) {
    let maps = params.cd4_maps().unwrap();
    let mut individual = Individual::new(IndividualId(id), 30.0, 1.0, params);
    individual.create_susceptibility(1.0, 1.0, params);
    individual.acquire_tb_infection(StrainKind::DrugSensitive, params, &maps);
    individual.drain_events();
    (individual, maps)
}

#[test]
fn latency_resolves_to_exactly_one_outcome() {
    // Short latency with competing cure: every individual's latent period
    // ends in exactly one of clearance or presymptomatic activation.
    let mut params = base_params(100);
    params.susceptibility.fast_progressor_fraction_adult = 1.0;
    params.infection.fast_progressor_rate = 0.05;
    params.infection.latent_cure_rate = 0.05;
    let pool = ContagionPool::new();
    for id in 0..200 {
        let (mut individual, maps) = infected_individual(id, &params);
        let mut outcomes = 0;
        for _ in 0..2000 {
            individual.update(&params, &maps, &pool);
            for event in individual.drain_events() {
                match event {
                    DiseaseEvent::Cleared | DiseaseEvent::ActivationPresymptomatic => {
                        outcomes += 1;
                    }
                    _ => {}
                }
            }
            if outcomes > 0 {
                break;
            }
        }
        assert_eq!(outcomes, 1, "individual {id} left latency ambiguously");
    }
}

#[test]
fn cd4_breakpoints_are_exact() {
    let map = Cd4Map::from_parallel(&[0.0, 50.0, 200.0, 500.0], &[8.0, 5.0, 2.0, 1.0]).unwrap();
    assert!((map.multiplier(50.0) - 5.0).abs() < f64::EPSILON);
    assert!((map.multiplier(200.0) - 2.0).abs() < f64::EPSILON);
    // And interpolation holds strictly between them
    let mid = map.multiplier(125.0);
    assert!(mid > 2.0 && mid < 5.0);
}

#[test]
fn resistance_emerges_at_the_configured_rate() {
    let resistance_rate = 0.02;
    let mut params = base_params(7);
    fast_activation(&mut params);
    let mut evolved = 0_u32;
    let n: u32 = 2000;
    for id in 0..n {
        let (mut individual, maps) = infected_individual(u64::from(id), &params);
        let pool = ContagionPool::new();
        // Two steps to reach symptomatic disease.
        individual.update(&params, &maps, &pool);
        individual.update(&params, &maps, &pool);
        individual.drain_events();
        individual.give_tb_drug(TbDrug {
            effects: DrugEffects {
                clearance_rate: 1.0e-6,
                resistance_rate,
                ..DrugEffects::default()
            },
            remaining_days: 365.0,
        });
        individual.update(&params, &maps, &pool);
        if individual
            .drain_events()
            .contains(&DiseaseEvent::EvolvedResistance)
        {
            evolved += 1;
        }
    }
    let observed = f64::from(evolved) / f64::from(n);
    assert!(
        (observed - resistance_rate).abs() < 0.01,
        "observed resistance frequency {observed}"
    );
}

#[test]
fn resistance_never_coincides_with_clearance() {
    // High clearance pressure plus a high resistance rate: in any single
    // step an infection may evolve resistance or clear, never both.
    let mut params = base_params(13);
    fast_activation(&mut params);
    for id in 0..500 {
        let (mut individual, maps) = infected_individual(id, &params);
        let pool = ContagionPool::new();
        individual.update(&params, &maps, &pool);
        individual.update(&params, &maps, &pool);
        individual.drain_events();
        individual.give_tb_drug(TbDrug {
            effects: DrugEffects {
                clearance_rate: 0.5,
                resistance_rate: 0.5,
                ..DrugEffects::default()
            },
            remaining_days: 365.0,
        });
        for _ in 0..50 {
            individual.update(&params, &maps, &pool);
            let events = individual.drain_events();
            assert!(
                !(events.contains(&DiseaseEvent::EvolvedResistance)
                    && events.contains(&DiseaseEvent::Cleared)),
                "resistance evolution and clearance in the same step"
            );
            if !individual.is_alive() || individual.tb_infections().is_empty() {
                break;
            }
        }
    }
}

#[test]
fn art_withdrawal_reopens_activation() {
    // While on ART with a full reactivation block, a slow latent infection
    // never activates; stopping ART resamples the latency against the
    // unblocked hazards and activation follows quickly.
    let mut params = base_params(19);
    params.susceptibility.fast_progressor_fraction_adult = 0.0;
    params.infection.latent_cure_rate = 0.0;
    params.coinfection.activation_hazards = vec![1.0, 1.0, 1.0, 1.0];
    params.coinfection.art_extra_reactivation_reduction = 0.0;
    let maps = params.cd4_maps().unwrap();
    let pool = ContagionPool::new();

    let mut individual = Individual::new(IndividualId(0), 30.0, 1.0, &params);
    individual.create_susceptibility(1.0, 1.0, &params);
    individual.acquire_hiv_infection(&params, &maps);
    individual.start_art(&params, &maps);
    individual.acquire_tb_infection(StrainKind::DrugSensitive, &params, &maps);
    individual.drain_events();

    for _ in 0..200 {
        individual.update(&params, &maps, &pool);
        let events = individual.drain_events();
        assert!(
            !events.contains(&DiseaseEvent::ActivationPresymptomatic),
            "activated while fully blocked on ART"
        );
    }

    individual.stop_art(&params, &maps);
    individual.drain_events();
    let mut activated = false;
    for _ in 0..60 {
        individual.update(&params, &maps, &pool);
        if individual
            .drain_events()
            .contains(&DiseaseEvent::ActivationPresymptomatic)
        {
            activated = true;
            break;
        }
    }
    assert!(activated, "no activation after ART withdrawal");
}

#[test]
fn transmission_closes_the_loop() {
    // An infectious host deposits contagion; a susceptible host exposed to
    // the snapshot acquires a latent infection of the deposited strain.
    let mut params = base_params(23);
    fast_activation(&mut params);
    params.susceptibility.smear_positive_fraction_adult = 1.0;
    params.susceptibility.extrapulmonary_fraction_adult = 0.0;
    params.infection.base_infectivity = 1.0e9;
    let (mut source, maps) = infected_individual(0, &params);
    let pool = ContagionPool::new();
    source.update(&params, &maps, &pool);
    source.update(&params, &maps, &pool);
    source.update(&params, &maps, &pool);
    assert!(pool.total(StrainKind::DrugSensitive) > 0.0);

    let mut contact = Individual::new(IndividualId(1), 30.0, 1.0, &params);
    contact.create_susceptibility(1.0, 1.0, &params);
    let snapshot = pool.snapshot();
    contact.expose(&snapshot, params.time_step, &params, &maps);
    assert_eq!(contact.tb_infections().len(), 1);
    assert_eq!(
        contact.tb_infections()[0].strain(),
        StrainKind::DrugSensitive
    );
    pool.reset();
    assert!(pool.snapshot().total() == 0.0);
}

#[test]
fn identical_runs_produce_identical_event_streams() {
    let run = || {
        let mut params = base_params(31);
        params.susceptibility.fast_progressor_fraction_adult = 0.3;
        params.infection.fast_progressor_rate = 0.01;
        params.infection.latent_cure_rate = 0.001;
        params.infection_updates_per_step = 2;
        let maps = params.cd4_maps().unwrap();
        let pool = ContagionPool::new();
        let mut individuals: Vec<Individual> = (0..20)
            .map(|id| {
                let mut individual = Individual::new(IndividualId(id), 30.0, 1.0, &params);
                individual.create_susceptibility(1.0, 1.0, &params);
                if id % 3 == 0 {
                    individual.acquire_hiv_infection(&params, &maps);
                }
                if id % 2 == 0 {
                    individual.acquire_tb_infection(StrainKind::DrugSensitive, &params, &maps);
                }
                individual
            })
            .collect();

        let mut trace: Vec<(u32, u64, DiseaseEvent)> = Vec::new();
        for step in 0..300_u32 {
            for individual in &mut individuals {
                individual.update(&params, &maps, &pool);
            }
            let snapshot = pool.snapshot();
            for individual in &mut individuals {
                individual.expose(&snapshot, params.time_step, &params, &maps);
                for event in individual.drain_events() {
                    trace.push((step, individual.id().0, event));
                }
            }
            pool.reset();
        }
        trace
    };
    assert_eq!(run(), run());
}

#[test]
fn invalid_configuration_fails_before_simulation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "susceptibility": {{
                "smear_positive_fraction_adult": 0.9,
                "extrapulmonary_fraction_adult": 0.5
            }}
        }}"#
    )
    .unwrap();
    let result = Parameters::from_json_file(file.path());
    assert!(result.is_err());
}
