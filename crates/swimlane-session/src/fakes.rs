//! In-process stand-ins for the diagram engine and storage (testing only)
//!
//! `ScriptedEngine` accepts any well-formed XML unless told otherwise and
//! remembers everything imported and every modeling command it ran;
//! `UnavailableStore` fails every call.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use swimlane_core::{ElementType, Slot, SlotStore};
use tokio::sync::broadcast;

use crate::engine::{DiagramEngine, ElementPatch, EngineEvent, ImportOutcome};
use crate::error::EngineError;

/// A modeling command the engine accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    UpdateProperties { id: String, patch: ElementPatch },
    CreateShape { kind: ElementType, id: String },
}

#[derive(Debug, Default)]
struct Script {
    current: Option<String>,
    imports: Vec<String>,
    /// Ids of the process children in the current diagram plus created shapes
    registry: Vec<String>,
    commands: Vec<EngineCommand>,
    next_shape: usize,
    reject_markers: Vec<String>,
    fail_saves: bool,
    fail_commands: bool,
}

#[derive(Debug)]
pub struct ScriptedEngine {
    script: Mutex<Script>,
    events: broadcast::Sender<EngineEvent>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        ScriptedEngine {
            script: Mutex::new(Script::default()),
            events,
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject any import whose XML contains `marker`.
    pub fn reject_containing(&self, marker: &str) {
        self.script().reject_markers.push(marker.to_string());
    }

    pub fn fail_saves(&self) {
        self.script().fail_saves = true;
    }

    pub fn fail_commands(&self) {
        self.script().fail_commands = true;
    }

    /// Every modeling command the engine accepted, in order.
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.script().commands.clone()
    }

    /// Whether an element with `id` exists in the engine.
    pub fn has_element(&self, id: &str) -> bool {
        self.script().registry.iter().any(|known| known == id)
    }

    /// Every XML document the engine accepted, in order.
    pub fn imports(&self) -> Vec<String> {
        self.script().imports.clone()
    }

    pub fn current(&self) -> Option<String> {
        self.script().current.clone()
    }

    /// Simulate a user edit inside the engine.
    pub fn edit(&self, xml: &str) {
        self.script().current = Some(xml.to_string());
        let _ = self.events.send(EngineEvent::CommandStackChanged);
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl DiagramEngine for ScriptedEngine {
    async fn import_xml(&self, xml: &str) -> Result<ImportOutcome, EngineError> {
        let mut script = self.script();
        if let Some(marker) = script.reject_markers.iter().find(|m| xml.contains(m.as_str())) {
            return Err(EngineError::ImportRejected(format!("refused content: {marker}")));
        }
        let summary = swimlane_core::summarize(xml)
            .map_err(|e| EngineError::ImportRejected(e.to_string()))?;
        script.registry = summary.elements.into_iter().map(|e| e.id).collect();
        script.current = Some(xml.to_string());
        script.imports.push(xml.to_string());
        Ok(ImportOutcome::default())
    }

    async fn save_xml(&self) -> Result<String, EngineError> {
        let script = self.script();
        if script.fail_saves {
            return Err(EngineError::SaveFailed("engine busy".to_string()));
        }
        script
            .current
            .clone()
            .ok_or_else(|| EngineError::SaveFailed("no diagram loaded".to_string()))
    }

    async fn update_properties(&self, id: &str, patch: &ElementPatch) -> Result<(), EngineError> {
        {
            let mut script = self.script();
            if script.fail_commands {
                return Err(EngineError::CommandFailed("updateProperties".to_string()));
            }
            let Some(slot) = script.registry.iter().position(|known| known == id) else {
                return Err(EngineError::UnknownElement(id.to_string()));
            };
            if let Some(new_id) = &patch.id {
                script.registry[slot] = new_id.clone();
            }
            script.commands.push(EngineCommand::UpdateProperties {
                id: id.to_string(),
                patch: patch.clone(),
            });
        }
        let _ = self.events.send(EngineEvent::CommandStackChanged);
        Ok(())
    }

    async fn create_shape(&self, kind: ElementType) -> Result<String, EngineError> {
        let mut script = self.script();
        if script.fail_commands {
            return Err(EngineError::CommandFailed("createShape".to_string()));
        }
        script.next_shape += 1;
        let id = format!("Shape_{}", script.next_shape);
        script.registry.push(id.clone());
        script.commands.push(EngineCommand::CreateShape {
            kind,
            id: id.clone(),
        });
        Ok(id)
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

/// Storage that is always down.
#[derive(Debug, Default)]
pub struct UnavailableStore;

fn unavailable() -> swimlane_core::Error {
    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "storage quota exceeded").into()
}

impl SlotStore for UnavailableStore {
    fn get(&self, _slot: Slot) -> swimlane_core::Result<Option<String>> {
        Err(unavailable())
    }

    fn set(&self, _slot: Slot, _value: &str) -> swimlane_core::Result<()> {
        Err(unavailable())
    }

    fn remove(&self, _slot: Slot) -> swimlane_core::Result<()> {
        Err(unavailable())
    }
}
