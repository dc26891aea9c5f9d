//! CSV reporting of simulation output.
//!
//! A [`ReportSink`] owns one csv writer per registered report type; rows are
//! serde structs. The [`TransitionReport`] row records every disease event
//! an individual emits, stamped with the simulation time.

use csv::Writer;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::Path;

use crate::error::TbsimError;
use crate::events::DiseaseEvent;
use crate::individual::IndividualId;

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>);
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! create_report_trait {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(&self, writer: &mut csv::Writer<std::fs::File>) {
                writer.serialize(self).unwrap();
            }
        }
    };
}

// Checks that the path is valid. Creates the file and all parent directories
// if they do not exist. Returns the file if successful. Called by
// `add_report`.
fn generate_validate_filepath(path_name: &str) -> Result<File, TbsimError> {
    let path = Path::new(path_name);
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            create_dir_all(path.parent().expect("Either root or empty path provided"))?;
            let file = File::create(path)?;
            Ok(file)
        }
        _ => Err(TbsimError::from(
            "Report output files must be CSVs at this time",
        )),
    }
}

/// Holds the csv writer for each registered report type.
#[derive(Default)]
pub struct ReportSink {
    file_writers: HashMap<TypeId, Writer<File>>,
}

impl ReportSink {
    #[must_use]
    pub fn new() -> ReportSink {
        ReportSink::default()
    }

    /// Registers a report type, creating its output file (and any parent
    /// directories).
    ///
    /// # Errors
    ///
    /// Returns a `TbsimError` if the path is not a csv or cannot be created.
    pub fn add_report<T: Report>(&mut self, filepath: &str) -> Result<(), TbsimError> {
        let file = generate_validate_filepath(filepath)?;
        self.file_writers.insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    /// Writes one row to the file registered for the report's type.
    ///
    /// # Panics
    ///
    /// Panics if the report type was never added; reporting to an
    /// unregistered type is a program bug.
    pub fn send_report<T: Report>(&mut self, report: T) {
        let writer = self
            .file_writers
            .get_mut(&report.type_id())
            .expect("No writer found for the report type");
        report.serialize(writer);
        writer.flush().expect("Failed to flush writer");
    }
}

/// One disease event of one individual at one point in simulation time.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransitionReport {
    pub time: f64,
    pub individual: u64,
    pub event: DiseaseEvent,
}

create_report_trait!(TransitionReport);

impl TransitionReport {
    #[must_use]
    pub fn new(time: f64, individual: IndividualId, event: DiseaseEvent) -> TransitionReport {
        TransitionReport {
            time,
            individual: individual.0,
            event,
        }
    }
}

/// Writes one transition row per drained event.
pub fn record_transitions(
    sink: &mut ReportSink,
    time: f64,
    individual: IndividualId,
    events: &[DiseaseEvent],
) {
    for &event in events {
        sink.send_report(TransitionReport::new(time, individual, event));
    }
}
