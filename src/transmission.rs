//! The shared contagion pool.
//!
//! Individuals deposit infectiousness into per-strain buckets during their
//! update; the simulation loop snapshots the pool to expose hosts and
//! resets it at the end of each step. Buckets are f64 values stored as
//! atomic bits so concurrent depositors never need a lock.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::random::IndividualRng;
use crate::strain::StrainKind;

#[derive(Debug, Default)]
pub struct ContagionPool {
    sensitive_bits: AtomicU64,
    resistant_bits: AtomicU64,
}

fn atomic_add_f64(bits: &AtomicU64, amount: f64) {
    let mut current = bits.load(Ordering::Relaxed);
    loop {
        let updated = (f64::from_bits(current) + amount).to_bits();
        match bits.compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

impl ContagionPool {
    #[must_use]
    pub fn new() -> ContagionPool {
        ContagionPool::default()
    }

    /// Adds deposited infectiousness to the bucket for `strain`.
    pub fn deposit(&self, strain: StrainKind, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        match strain {
            StrainKind::DrugSensitive => atomic_add_f64(&self.sensitive_bits, amount),
            StrainKind::FirstLineResistant => atomic_add_f64(&self.resistant_bits, amount),
        }
    }

    #[must_use]
    pub fn total(&self, strain: StrainKind) -> f64 {
        let bits = match strain {
            StrainKind::DrugSensitive => &self.sensitive_bits,
            StrainKind::FirstLineResistant => &self.resistant_bits,
        };
        f64::from_bits(bits.load(Ordering::Relaxed))
    }

    /// A consistent read of both buckets for use during exposure.
    #[must_use]
    pub fn snapshot(&self) -> ContagionSnapshot {
        ContagionSnapshot {
            sensitive: self.total(StrainKind::DrugSensitive),
            resistant: self.total(StrainKind::FirstLineResistant),
        }
    }

    /// Zeroes both buckets at the end of a step.
    pub fn reset(&self) {
        self.sensitive_bits.store(0.0_f64.to_bits(), Ordering::Relaxed);
        self.resistant_bits.store(0.0_f64.to_bits(), Ordering::Relaxed);
    }
}

/// The pool contents at a point in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContagionSnapshot {
    pub sensitive: f64,
    pub resistant: f64,
}

impl ContagionSnapshot {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.sensitive + self.resistant
    }

    /// Picks the strain of a new acquisition in proportion to each bucket's
    /// share of the pool. Returns `None` when the pool is empty.
    pub fn resolve_strain(&self, rng: &mut IndividualRng) -> Option<StrainKind> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        if rng.uniform() < self.sensitive / total {
            Some(StrainKind::DrugSensitive)
        } else {
            Some(StrainKind::FirstLineResistant)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::random::{IndividualRng, NATURAL_HISTORY_STREAM};
    use assert_approx_eq::assert_approx_eq;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn deposits_accumulate_per_strain() {
        let pool = ContagionPool::new();
        pool.deposit(StrainKind::DrugSensitive, 1.5);
        pool.deposit(StrainKind::DrugSensitive, 0.5);
        pool.deposit(StrainKind::FirstLineResistant, 0.25);
        assert_approx_eq!(pool.total(StrainKind::DrugSensitive), 2.0);
        assert_approx_eq!(pool.total(StrainKind::FirstLineResistant), 0.25);
        pool.reset();
        assert_approx_eq!(pool.total(StrainKind::DrugSensitive), 0.0);
        assert_approx_eq!(pool.total(StrainKind::FirstLineResistant), 0.0);
    }

    #[test]
    fn non_positive_deposits_ignored() {
        let pool = ContagionPool::new();
        pool.deposit(StrainKind::DrugSensitive, 0.0);
        pool.deposit(StrainKind::DrugSensitive, -1.0);
        assert_approx_eq!(pool.total(StrainKind::DrugSensitive), 0.0);
    }

    #[test]
    fn concurrent_deposits_are_not_lost() {
        let pool = Arc::new(ContagionPool::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    pool.deposit(StrainKind::DrugSensitive, 0.001);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_approx_eq!(pool.total(StrainKind::DrugSensitive), 8.0, 1e-9);
    }

    #[test]
    fn empty_pool_resolves_no_strain() {
        let snapshot = ContagionSnapshot::default();
        let mut rng = IndividualRng::new(1, NATURAL_HISTORY_STREAM, 0);
        assert_eq!(snapshot.resolve_strain(&mut rng), None);
    }

    #[test]
    fn strain_resolution_is_proportional() {
        let snapshot = ContagionSnapshot {
            sensitive: 3.0,
            resistant: 1.0,
        };
        let mut sensitive = 0_u32;
        let n: u32 = 10_000;
        for seed in 0..u64::from(n) {
            let mut rng = IndividualRng::new(seed, NATURAL_HISTORY_STREAM, 0);
            if snapshot.resolve_strain(&mut rng) == Some(StrainKind::DrugSensitive) {
                sensitive += 1;
            }
        }
        let observed = f64::from(sensitive) / f64::from(n);
        assert!((observed - 0.75).abs() < 0.02);
    }
}
