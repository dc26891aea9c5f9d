//! HIV-side state: CD4 trajectory and the ART reconstitution model.
//!
//! Untreated CD4 declines linearly in sqrt space between the post-infection
//! and at-death anchors over the prognosis. On ART the count instead grows
//! from its value at ART start by a quadratic in months on treatment,
//! saturating after roughly three years. The forward projection of this
//! trajectory feeds the latent TB activation schedule.

use serde::{Deserialize, Serialize};

use crate::parameters::CoinfectionParams;

/// CD4 count reported for hosts without HIV.
pub const HEALTHY_CD4: f64 = 1000.0;

const DAYS_PER_MONTH: f64 = 365.0 / 12.0;

// CD4 reconstitution on ART, in cells per month on treatment.
const ART_CD4_GAIN_LINEAR: f64 = 15.584;
const ART_CD4_GAIN_QUADRATIC: f64 = 0.2113;
const ART_CD4_GAIN_MAX: f64 = 287.341_5;
const ART_CD4_GAIN_SATURATION_MONTHS: f64 = 3.073 * 12.0;

fn art_cd4_gain(months_on_art: f64) -> f64 {
    if months_on_art >= ART_CD4_GAIN_SATURATION_MONTHS {
        return ART_CD4_GAIN_MAX;
    }
    ART_CD4_GAIN_LINEAR * months_on_art - ART_CD4_GAIN_QUADRATIC * months_on_art * months_on_art
}

/// A host's HIV infection record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HivInfection {
    /// Days since HIV acquisition.
    pub duration: f64,
    /// Untreated survival from acquisition, in days.
    pub prognosis_days: f64,
}

impl HivInfection {
    #[must_use]
    pub fn new(prognosis_days: f64) -> HivInfection {
        HivInfection {
            duration: 0.0,
            prognosis_days,
        }
    }

    pub fn update(&mut self, dt: f64) {
        self.duration += dt;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HivSusceptibility {
    /// Current sqrt CD4 on the untreated track.
    sqrt_cd4: f64,
    /// Daily decline of sqrt CD4 while untreated (non-negative).
    sqrt_decline_per_day: f64,
    /// CD4 at the moment ART started, if currently on ART.
    cd4_at_art_start: Option<f64>,
    days_on_art: f64,
}

impl HivSusceptibility {
    /// Creates the CD4 model at HIV acquisition from the configured anchors.
    #[must_use]
    pub fn new(params: &CoinfectionParams) -> HivSusceptibility {
        let sqrt_start = params.cd4_post_infection.max(0.0).sqrt();
        let sqrt_end = params.cd4_at_death.max(0.0).sqrt();
        HivSusceptibility {
            sqrt_cd4: sqrt_start,
            sqrt_decline_per_day: (sqrt_start - sqrt_end) / params.hiv_prognosis_days,
            cd4_at_art_start: None,
            days_on_art: 0.0,
        }
    }

    /// Advances the trajectory by `dt` days. Decline only accrues while off
    /// ART; time on ART accrues toward reconstitution instead.
    pub fn update(&mut self, dt: f64) {
        if self.cd4_at_art_start.is_some() {
            self.days_on_art += dt;
        } else {
            self.sqrt_cd4 = (self.sqrt_cd4 - self.sqrt_decline_per_day * dt).max(0.0);
        }
    }

    /// The current CD4 count.
    #[must_use]
    pub fn cd4_count(&self) -> f64 {
        match self.cd4_at_art_start {
            Some(at_start) => at_start + art_cd4_gain(self.days_on_art / DAYS_PER_MONTH),
            None => self.sqrt_cd4 * self.sqrt_cd4,
        }
    }

    #[must_use]
    pub fn on_art(&self) -> bool {
        self.cd4_at_art_start.is_some()
    }

    /// Pins the reconstitution curve to the current count. No-op if already
    /// on ART.
    pub fn start_art(&mut self) {
        if self.cd4_at_art_start.is_none() {
            self.cd4_at_art_start = Some(self.cd4_count());
            self.days_on_art = 0.0;
        }
    }

    /// Resumes the untreated decline from the current count.
    pub fn stop_art(&mut self) {
        if self.cd4_at_art_start.is_some() {
            self.sqrt_cd4 = self.cd4_count().sqrt();
            self.cd4_at_art_start = None;
            self.days_on_art = 0.0;
        }
    }

    /// Projects the CD4 count forward at `step_days` intervals, starting
    /// from now, assuming the current ART status persists.
    #[must_use]
    pub fn forward_cd4(&self, num_steps: usize, step_days: f64) -> Vec<f64> {
        let mut projection = self.clone();
        let mut counts = Vec::with_capacity(num_steps);
        for _ in 0..num_steps {
            counts.push(projection.cd4_count());
            projection.update(step_days);
        }
        counts
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn params() -> CoinfectionParams {
        CoinfectionParams {
            cd4_post_infection: 550.0,
            cd4_at_death: 50.0,
            hiv_prognosis_days: 4000.0,
            ..CoinfectionParams::default()
        }
    }

    #[test]
    fn untreated_decline_hits_anchors() {
        let params = params();
        let mut hiv = HivSusceptibility::new(&params);
        assert_approx_eq!(hiv.cd4_count(), 550.0, 1e-6);
        hiv.update(4000.0);
        assert_approx_eq!(hiv.cd4_count(), 50.0, 1e-6);
    }

    #[test]
    fn decline_is_linear_in_sqrt_space() {
        let params = params();
        let mut hiv = HivSusceptibility::new(&params);
        hiv.update(2000.0);
        let expected = (550.0_f64.sqrt() + 50.0_f64.sqrt()) / 2.0;
        assert_approx_eq!(hiv.cd4_count().sqrt(), expected, 1e-9);
    }

    #[test]
    fn art_reconstitution_saturates() {
        let params = params();
        let mut hiv = HivSusceptibility::new(&params);
        hiv.update(2000.0);
        let cd4_at_start = hiv.cd4_count();
        hiv.start_art();
        // Well past the saturation point
        hiv.update(10.0 * 365.0);
        assert_approx_eq!(hiv.cd4_count(), cd4_at_start + ART_CD4_GAIN_MAX, 1e-6);
    }

    #[test]
    fn art_gain_is_quadratic_before_saturation() {
        let gain_12 = art_cd4_gain(12.0);
        assert_approx_eq!(gain_12, 15.584 * 12.0 - 0.2113 * 144.0, 1e-9);
        // Monotone up to the saturation month
        assert!(art_cd4_gain(24.0) > gain_12);
        assert!(art_cd4_gain(ART_CD4_GAIN_SATURATION_MONTHS) <= ART_CD4_GAIN_MAX + 1.0);
    }

    #[test]
    fn stopping_art_resumes_decline_from_current_count() {
        let params = params();
        let mut hiv = HivSusceptibility::new(&params);
        hiv.update(1000.0);
        hiv.start_art();
        hiv.update(365.0);
        let on_art_count = hiv.cd4_count();
        hiv.stop_art();
        assert_approx_eq!(hiv.cd4_count(), on_art_count, 1e-9);
        hiv.update(500.0);
        assert!(hiv.cd4_count() < on_art_count);
    }

    #[test]
    fn forward_projection_matches_stepped_updates() {
        let params = params();
        let hiv = HivSusceptibility::new(&params);
        let projection = hiv.forward_cd4(5, 30.0);
        assert_eq!(projection.len(), 5);
        let mut stepped = hiv.clone();
        for &count in &projection {
            assert_approx_eq!(stepped.cd4_count(), count, 1e-9);
            stepped.update(30.0);
        }
        // Projection does not mutate the source
        assert_approx_eq!(hiv.cd4_count(), 550.0, 1e-6);
    }

    #[test]
    fn cd4_never_negative() {
        let params = params();
        let mut hiv = HivSusceptibility::new(&params);
        hiv.update(1.0e6);
        assert!(hiv.cd4_count() >= 0.0);
    }
}
