//! Diagram session controller: loads, imports, saves and exports diagrams
//! through an external rendering engine, with storage-backed recovery and
//! user notifications.

pub mod controller;
pub mod engine;
pub mod error;
pub mod fakes;
pub mod notify;

pub use controller::{DiagramSession, SessionConfig, SessionState};
pub use engine::{DiagramEngine, ElementPatch, EngineEvent, ImportOutcome, SelectedElement};
pub use error::{EngineError, SessionError, SessionResult};
pub use notify::{Notification, NotificationCenter, NotificationKind};
