//! Error types for swimlane-core

use thiserror::Error;

/// Errors raised at the edges of the core: parsing input, reading XML, touching storage.
///
/// Normalization and compilation never fail and have no variant here.
#[derive(Error, Debug)]
pub enum Error {
    /// Stored or AI-produced text is not JSON
    #[error("process JSON could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    /// Text parsed as JSON but is not an object
    #[error("process JSON must be an object")]
    NotAnObject,

    /// BPMN XML could not be read
    #[error("BPMN XML is malformed: {0}")]
    Xml(String),

    /// Slot storage is unavailable
    #[error("storage unavailable: {0}")]
    Storage(#[from] std::io::Error),

    /// Settings file exists but is unusable
    #[error("settings file is invalid: {0}")]
    Settings(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
