//! The narrow slice of the diagram rendering engine the session depends on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swimlane_core::ElementType;
use tokio::sync::broadcast;

use crate::error::EngineError;

/// Result of a successful import. Warnings are informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// The element the user currently has selected in the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedElement {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub documentation: String,
}

impl SelectedElement {
    /// Fold an accepted patch into the cached selection.
    pub fn apply(&mut self, patch: &ElementPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(id) = &patch.id {
            self.id = id.clone();
        }
    }
}

/// Property edits for one element. `None` leaves a property untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ElementPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        ElementPatch {
            name: Some(name.into()),
            id: None,
        }
    }

    pub fn reid(id: impl Into<String>) -> Self {
        ElementPatch {
            name: None,
            id: Some(id.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Selection changed; `None` when zero or several elements are selected
    SelectionChanged(Option<SelectedElement>),
    /// Any edit command ran against the diagram
    CommandStackChanged,
}

/// Diagram engine as seen by the session.
///
/// Calls are awaited one at a time; each depends on the diagram state the
/// previous one left behind.
#[async_trait]
pub trait DiagramEngine: Send + Sync {
    /// Replace the current diagram. Rejects malformed XML.
    async fn import_xml(&self, xml: &str) -> Result<ImportOutcome, EngineError>;

    /// Serialize the current diagram, including edits made inside the engine.
    async fn save_xml(&self) -> Result<String, EngineError>;

    /// Change properties of the element with `id`. An edit command, so the
    /// engine follows it with `CommandStackChanged`.
    async fn update_properties(&self, id: &str, patch: &ElementPatch) -> Result<(), EngineError>;

    /// Start placing a new shape of `kind`; returns the id the engine gave it.
    async fn create_shape(&self, kind: ElementType) -> Result<String, EngineError>;

    /// Subscribe to selection and edit events.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}
