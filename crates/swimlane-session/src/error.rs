//! Error types for swimlane-session

use thiserror::Error;

/// Failures reported by the external diagram engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine refused the XML handed to `import_xml`
    #[error("diagram import rejected: {0}")]
    ImportRejected(String),

    /// The engine could not serialize its current diagram
    #[error("diagram save failed: {0}")]
    SaveFailed(String),

    /// No element with this id exists in the current diagram
    #[error("element not found: {0}")]
    UnknownElement(String),

    /// A modeling command was refused
    #[error("modeling command failed: {0}")]
    CommandFailed(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    /// Even the built-in blank template was refused; the engine is unusable
    #[error("default template rejected by the diagram engine: {0}")]
    TemplateRejected(EngineError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Saved XML could not be summarized
    #[error(transparent)]
    Core(#[from] swimlane_core::Error),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
