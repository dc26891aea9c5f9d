//! tbsim is a per-individual tuberculosis natural-history engine with
//! HIV coinfection, intended as the disease core of an agent-based
//! simulation.
//!
//! Each [`Individual`](individual::Individual) owns its TB infection
//! records, immunology, HIV state, and intervention containers, and is
//! driven through two entry points: `update`, which advances all disease
//! state by one time step and deposits infectiousness into the shared
//! [`ContagionPool`](transmission::ContagionPool), and `expose`, which
//! converts pool contagion into new infections. All stochastic decisions
//! run on deterministic per-individual random streams, so a fixed seed and
//! configuration reproduce a run exactly.
//!
//! The TB state machine covers latency (constant-rate, age-dependent, and
//! CD4-scheduled activation), presymptomatic and symptomatic disease with
//! smear-stratified presentation, treatment with resistance evolution and
//! relapse, and the CD4-indexed cross-disease modulation that couples the
//! two infections.

pub mod cd4;
pub mod checkpoint;
pub mod drugs;
pub mod error;
pub mod events;
pub mod hiv;
pub mod individual;
pub mod infection;
pub mod interventions;
pub mod log;
pub mod parameters;
pub mod random;
pub mod report;
pub mod strain;
pub mod susceptibility;
pub mod transmission;

pub use error::TbsimError;
pub use events::DiseaseEvent;
pub use individual::{Individual, IndividualId};
pub use parameters::Parameters;
pub use strain::StrainKind;
pub use transmission::ContagionPool;
