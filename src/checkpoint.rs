//! Binary checkpoints of the full per-individual state graph.
//!
//! A checkpoint captures the simulation time and every individual's state,
//! including all timers and elapsed durations, so a restored run resumes
//! exactly where it stopped. Random streams are stored as their positions;
//! restore rebuilds each stream from the seed and fast-forwards it, so a
//! resumed run is bit-identical to an uninterrupted one.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TbsimError;
use crate::individual::Individual;

#[derive(Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub time: f64,
    pub individuals: Vec<Individual>,
}

/// Serializes the simulation state to `path`.
///
/// # Errors
///
/// Returns a `TbsimError` on serialization or file write failure.
pub fn save_checkpoint<P: AsRef<Path>>(
    path: P,
    time: f64,
    individuals: &[Individual],
) -> Result<(), TbsimError> {
    let checkpoint = Checkpoint {
        time,
        individuals: individuals.to_vec(),
    };
    let bytes = bincode::serde::encode_to_vec(&checkpoint, bincode::config::standard())?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Restores a checkpoint written by [`save_checkpoint`], rebuilding every
/// individual's random stream at its saved position.
///
/// # Errors
///
/// Returns a `TbsimError` on read or deserialization failure.
pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Checkpoint, TbsimError> {
    let bytes = fs::read(path)?;
    let (mut checkpoint, _): (Checkpoint, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
    for individual in &mut checkpoint.individuals {
        individual.reseed();
    }
    Ok(checkpoint)
}
