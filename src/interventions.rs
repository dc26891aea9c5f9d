//! Per-host intervention state: TB drug regimens, ART, and the aggregated
//! acquisition/transmission/mortality modifiers.
//!
//! The container is an explicit composite of one TB and one HIV
//! sub-container; callers dispatch on [`DiseaseKind`] rather than probing
//! for capabilities.

use serde::{Deserialize, Serialize};

use crate::drugs::{TbDrug, TreatmentHistory};
use crate::events::DiseaseEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseKind {
    Tb,
    Hiv,
}

/// Active anti-TB regimens and the host's treatment history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TbDrugContainer {
    active_drugs: Vec<TbDrug>,
    history: TreatmentHistory,
}

impl TbDrugContainer {
    pub fn give_drug(&mut self, drug: TbDrug, events: &mut Vec<DiseaseEvent>) {
        self.active_drugs.push(drug);
        events.push(DiseaseEvent::TbDrugStarted);
    }

    /// Counts regimens down by one sub-step. A regimen that ends while the
    /// host still has symptomatic disease latches the failed flag.
    pub fn infectious_loop_update(
        &mut self,
        dt: f64,
        host_symptomatic: bool,
        events: &mut Vec<DiseaseEvent>,
    ) {
        let mut expired = 0_usize;
        self.active_drugs.retain_mut(|drug| {
            drug.remaining_days -= dt;
            if drug.remaining_days <= 0.0 {
                expired += 1;
                false
            } else {
                true
            }
        });
        for _ in 0..expired {
            events.push(DiseaseEvent::TbDrugExpired);
        }
        if expired > 0 && host_symptomatic && !self.history.failed {
            self.history.failed = true;
            events.push(DiseaseEvent::TreatmentFailed);
        }
    }

    /// Latches the relapsed flag when a treated host relapses.
    pub fn mark_relapsed(&mut self, events: &mut Vec<DiseaseEvent>) {
        if !self.history.relapsed {
            self.history.relapsed = true;
            events.push(DiseaseEvent::TreatmentRelapsed);
        }
    }

    #[must_use]
    pub fn on_treatment(&self) -> bool {
        !self.active_drugs.is_empty()
    }

    #[must_use]
    pub fn active_drugs(&self) -> &[TbDrug] {
        &self.active_drugs
    }

    #[must_use]
    pub fn history(&self) -> TreatmentHistory {
        self.history
    }
}

/// ART status. Time on ART lives with the CD4 model in
/// [`crate::hiv::HivSusceptibility`]; this container only gates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HivContainer {
    on_art: bool,
}

impl HivContainer {
    /// Returns whether the call changed anything.
    pub fn start_art(&mut self, events: &mut Vec<DiseaseEvent>) -> bool {
        if self.on_art {
            return false;
        }
        self.on_art = true;
        events.push(DiseaseEvent::ArtStarted);
        true
    }

    /// Returns whether the call changed anything.
    pub fn stop_art(&mut self, events: &mut Vec<DiseaseEvent>) -> bool {
        if !self.on_art {
            return false;
        }
        self.on_art = false;
        events.push(DiseaseEvent::ArtStopped);
        true
    }

    #[must_use]
    pub fn on_art(&self) -> bool {
        self.on_art
    }
}

/// The full per-host intervention state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionContainer {
    pub tb: TbDrugContainer,
    pub hiv: HivContainer,
    reduced_acquire: f64,
    reduced_transmit: f64,
    reduced_mortality: f64,
}

impl Default for InterventionContainer {
    fn default() -> Self {
        InterventionContainer {
            tb: TbDrugContainer::default(),
            hiv: HivContainer::default(),
            reduced_acquire: 1.0,
            reduced_transmit: 1.0,
            reduced_mortality: 1.0,
        }
    }
}

impl InterventionContainer {
    /// Folds a vaccine-like acquisition effect into the host multiplier.
    pub fn apply_reduced_acquire_effect(&mut self, multiplier: f64) {
        self.reduced_acquire *= multiplier;
    }

    pub fn apply_reduced_transmit_effect(&mut self, multiplier: f64) {
        self.reduced_transmit *= multiplier;
    }

    pub fn apply_reduced_mortality_effect(&mut self, multiplier: f64) {
        self.reduced_mortality *= multiplier;
    }

    #[must_use]
    pub fn reduced_acquire(&self) -> f64 {
        self.reduced_acquire
    }

    #[must_use]
    pub fn reduced_transmit(&self) -> f64 {
        self.reduced_transmit
    }

    #[must_use]
    pub fn reduced_mortality(&self) -> f64 {
        self.reduced_mortality
    }

    /// Whether the host is currently treated for the given disease.
    #[must_use]
    pub fn on_treatment(&self, kind: DiseaseKind) -> bool {
        match kind {
            DiseaseKind::Tb => self.tb.on_treatment(),
            DiseaseKind::Hiv => self.hiv.on_art(),
        }
    }
}
