use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `TbsimError` and maps other errors to
/// convert to a `TbsimError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum TbsimError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    Utf8Error(std::string::FromUtf8Error),
    SerializationError(String),
    TbsimError(String),
}

impl From<io::Error> for TbsimError {
    fn from(error: io::Error) -> Self {
        TbsimError::IoError(error)
    }
}

impl From<serde_json::Error> for TbsimError {
    fn from(error: serde_json::Error) -> Self {
        TbsimError::JsonError(error)
    }
}

impl From<csv::Error> for TbsimError {
    fn from(error: csv::Error) -> Self {
        TbsimError::CSVError(error)
    }
}

impl From<std::string::FromUtf8Error> for TbsimError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        TbsimError::Utf8Error(error)
    }
}

impl From<bincode::error::EncodeError> for TbsimError {
    fn from(error: bincode::error::EncodeError) -> Self {
        TbsimError::SerializationError(error.to_string())
    }
}

impl From<bincode::error::DecodeError> for TbsimError {
    fn from(error: bincode::error::DecodeError) -> Self {
        TbsimError::SerializationError(error.to_string())
    }
}

impl From<String> for TbsimError {
    fn from(error: String) -> Self {
        TbsimError::TbsimError(error)
    }
}

impl From<&str> for TbsimError {
    fn from(error: &str) -> Self {
        TbsimError::TbsimError(error.to_string())
    }
}

impl std::error::Error for TbsimError {}

impl Display for TbsimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {self:?}")?;
        Ok(())
    }
}
