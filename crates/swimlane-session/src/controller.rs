//! Diagram session lifecycle against an external engine.
//!
//! Every failure path converges on a renderable diagram: rejected input is
//! dropped, the user is warned, and the blank template is imported instead.

use std::time::Duration;

use serde::Serialize;
use swimlane_core::{
    parse_process_json, summarize, Compiler, DiagramSummary, ElementType, Settings, Slot,
    SlotStore, DEFAULT_TEMPLATE,
};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use crate::engine::{DiagramEngine, ElementPatch, EngineEvent, SelectedElement};
use crate::error::{EngineError, SessionError, SessionResult};
use crate::notify::{NotificationCenter, NotificationKind};

/// How long "tool activated" hints stay up.
const TOOL_HINT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Uninitialized,
    Loading,
    Ready,
    Modified,
    Saved,
    Exported,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub compiler: Compiler,
    pub default_template: String,
    pub notification_duration: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::from(&Settings::default())
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        SessionConfig {
            compiler: settings.compiler(),
            default_template: DEFAULT_TEMPLATE.to_string(),
            notification_duration: Duration::from_millis(settings.notification_ms),
        }
    }
}

/// Why stored or supplied input could not be shown.
#[derive(Debug, Error)]
enum Rejected {
    #[error(transparent)]
    Parse(#[from] swimlane_core::Error),
    #[error(transparent)]
    Import(#[from] EngineError),
}

pub struct DiagramSession<E, S> {
    engine: E,
    store: S,
    config: SessionConfig,
    notifications: NotificationCenter,
    events: broadcast::Receiver<EngineEvent>,
    state: SessionState,
    selected: Option<SelectedElement>,
}

impl<E: DiagramEngine, S: SlotStore> DiagramSession<E, S> {
    pub fn new(engine: E, store: S, config: SessionConfig) -> Self {
        let events = engine.subscribe();
        let notifications = NotificationCenter::new(config.notification_duration);
        DiagramSession {
            engine,
            store,
            config,
            notifications,
            events,
            state: SessionState::Uninitialized,
            selected: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selected(&self) -> Option<&SelectedElement> {
        self.selected.as_ref()
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Loading ---

    /// Bring up the first diagram: pending AI JSON, then the saved diagram,
    /// then the blank template.
    pub async fn load(&mut self) -> SessionResult<SessionState> {
        self.state = SessionState::Loading;

        if let Some(raw) = self.read_slot(Slot::PendingProcess) {
            match self.import_compiled(&raw).await {
                Ok(xml) => {
                    self.persist(Slot::Diagram, &xml);
                    self.clear_slot(Slot::PendingProcess);
                    self.notifications
                        .success("AI-generated diagram loaded successfully");
                    info!("loaded pending AI process");
                    return Ok(self.ready());
                }
                Err(e) => {
                    warn!(error = %e, "pending AI process unusable, falling back to template");
                    self.clear_slot(Slot::PendingProcess);
                    self.notifications
                        .warning("Failed to load AI diagram, loading a blank diagram instead");
                    return self.load_default().await;
                }
            }
        }

        if let Some(xml) = self.read_slot(Slot::Diagram) {
            match self.engine.import_xml(&xml).await {
                Ok(outcome) => {
                    debug!(warnings = outcome.warnings.len(), "restored saved diagram");
                    self.notifications.success("Diagram loaded from storage");
                    return Ok(self.ready());
                }
                Err(e) => {
                    warn!(error = %e, "saved diagram rejected, falling back to template");
                    self.clear_slot(Slot::Diagram);
                    self.notifications
                        .warning("Failed to load saved diagram, loading a blank diagram instead");
                    return self.load_default().await;
                }
            }
        }

        self.load_default().await
    }

    /// Replace whatever is shown with the blank template.
    pub async fn create_new(&mut self) -> SessionResult<SessionState> {
        let state = self.load_default().await?;
        self.notifications.success("New diagram created");
        Ok(state)
    }

    /// Compile process JSON (possibly wrapped in AI prose) and show it.
    pub async fn import_process(&mut self, text: &str) -> SessionResult<SessionState> {
        self.state = SessionState::Loading;
        match self.import_compiled(text).await {
            Ok(xml) => {
                self.persist(Slot::Diagram, &xml);
                self.notifications
                    .success("Diagram imported successfully from AI plan");
                Ok(self.ready())
            }
            Err(e) => {
                warn!(error = %e, "process import failed, falling back to template");
                self.notifications
                    .warning(format!("Failed to import diagram from AI plan: {e}"));
                self.load_default().await
            }
        }
    }

    /// Show BPMN XML supplied by the user as-is.
    pub async fn import_diagram(&mut self, xml: &str) -> SessionResult<SessionState> {
        self.state = SessionState::Loading;
        match self.engine.import_xml(xml).await {
            Ok(_) => {
                self.notifications.success("Diagram imported successfully");
                Ok(self.ready())
            }
            Err(e) => {
                warn!(error = %e, "diagram import failed, falling back to template");
                self.notifications.warning(
                    "Failed to import diagram. Please check the file format. A blank diagram was loaded instead",
                );
                self.load_default().await
            }
        }
    }

    async fn import_compiled(&self, text: &str) -> Result<String, Rejected> {
        let raw = parse_process_json(text)?;
        let xml = self.config.compiler.compile(raw);
        let outcome = self.engine.import_xml(&xml).await?;
        for warning in &outcome.warnings {
            debug!(%warning, "engine import warning");
        }
        Ok(xml)
    }

    async fn load_default(&mut self) -> SessionResult<SessionState> {
        self.state = SessionState::Loading;
        self.engine
            .import_xml(&self.config.default_template)
            .await
            .map_err(SessionError::TemplateRejected)?;
        Ok(self.ready())
    }

    fn ready(&mut self) -> SessionState {
        self.state = SessionState::Ready;
        self.selected = None;
        self.state
    }

    // --- Saving ---

    /// Persist the engine's current XML verbatim.
    pub async fn save(&mut self) -> SessionResult<String> {
        let xml = match self.engine.save_xml().await {
            Ok(xml) => xml,
            Err(e) => {
                error!(error = %e, "engine could not save diagram");
                self.notifications.error("Failed to save diagram");
                return Err(e.into());
            }
        };

        let stamp = chrono::Utc::now().to_rfc3339();
        let stored = self
            .store
            .set(Slot::Diagram, &xml)
            .and_then(|()| self.store.set(Slot::DiagramTimestamp, &stamp));
        match stored {
            Ok(()) => {
                self.state = SessionState::Saved;
                self.notifications.success("Diagram saved successfully!");
            }
            Err(e) => {
                error!(error = %e, "diagram could not be persisted");
                self.notifications
                    .error(format!("Failed to save diagram: {e}"));
            }
        }
        Ok(xml)
    }

    /// Hand the engine's current XML to the caller for download.
    pub async fn export(&mut self) -> SessionResult<String> {
        match self.engine.save_xml().await {
            Ok(xml) => {
                self.state = SessionState::Exported;
                self.notifications.success("Diagram exported successfully");
                Ok(xml)
            }
            Err(e) => {
                error!(error = %e, "engine could not export diagram");
                self.notifications.error("Failed to export diagram");
                Err(e.into())
            }
        }
    }

    /// Element summary of the diagram as the engine currently holds it.
    pub async fn json_view(&self) -> SessionResult<DiagramSummary> {
        let xml = self.engine.save_xml().await?;
        Ok(summarize(&xml)?)
    }

    // --- Modeling commands ---

    /// Edit the selected element through the engine and mirror the edit in
    /// [`selected`](Self::selected). Returns `Ok(false)` when nothing is selected.
    pub async fn update_selected(&mut self, mut patch: ElementPatch) -> SessionResult<bool> {
        let target = match &self.selected {
            Some(selected) => selected.id.clone(),
            None => return Ok(false),
        };
        if patch.id.as_deref() == Some(target.as_str()) {
            patch.id = None;
        }

        if !patch.is_empty() {
            if let Err(e) = self.engine.update_properties(&target, &patch).await {
                error!(element = %target, error = %e, "property update failed");
                self.notifications
                    .error("Failed to update element properties");
                return Err(e.into());
            }
        }
        if let Some(selected) = self.selected.as_mut() {
            selected.apply(&patch);
        }
        self.notifications.success("Element properties updated");
        Ok(true)
    }

    /// Start placing a new shape. `Ok(None)` for kinds the palette has no tool for.
    pub async fn create_shape(&mut self, kind: ElementType) -> SessionResult<Option<String>> {
        let Some(label) = tool_label(kind) else {
            self.notifications.warning("Tool not available");
            return Ok(None);
        };
        match self.engine.create_shape(kind).await {
            Ok(id) => {
                debug!(%id, ?kind, "shape placement started");
                self.notifications.push(
                    format!("{label} tool activated - click to place"),
                    NotificationKind::Success,
                    TOOL_HINT,
                );
                Ok(Some(id))
            }
            Err(e) => {
                error!(?kind, error = %e, "shape creation failed");
                self.notifications.error("Tool activation failed");
                Err(e.into())
            }
        }
    }

    // --- Engine events ---

    /// Apply every event the engine emitted since the last call. Returns how many were applied.
    pub fn pump_events(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    applied += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "dropped engine events");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        applied
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::SelectionChanged(selection) => self.selected = selection,
            EngineEvent::CommandStackChanged => {
                if matches!(
                    self.state,
                    SessionState::Ready
                        | SessionState::Modified
                        | SessionState::Saved
                        | SessionState::Exported
                ) {
                    self.state = SessionState::Modified;
                }
            }
        }
    }

    // --- Storage helpers; faults are reported, never fatal ---

    fn read_slot(&self, slot: Slot) -> Option<String> {
        match self.store.get(slot) {
            Ok(value) => value,
            Err(e) => {
                error!(slot = slot.key(), error = %e, "storage read failed");
                self.notifications.error(format!("Storage unavailable: {e}"));
                None
            }
        }
    }

    fn persist(&self, slot: Slot, value: &str) {
        if let Err(e) = self.store.set(slot, value) {
            error!(slot = slot.key(), error = %e, "storage write failed");
            self.notifications.error(format!("Storage unavailable: {e}"));
        }
    }

    fn clear_slot(&self, slot: Slot) {
        if let Err(e) = self.store.remove(slot) {
            error!(slot = slot.key(), error = %e, "storage clear failed");
            self.notifications.error(format!("Storage unavailable: {e}"));
        }
    }
}

fn tool_label(kind: ElementType) -> Option<&'static str> {
    match kind {
        ElementType::StartEvent => Some("Start Event"),
        ElementType::EndEvent => Some("End Event"),
        ElementType::IntermediateCatchEvent | ElementType::IntermediateThrowEvent => {
            Some("Intermediate Event")
        }
        ElementType::Task | ElementType::UserTask | ElementType::ServiceTask => Some("Task"),
        ElementType::ExclusiveGateway => Some("Exclusive Gateway"),
        ElementType::ParallelGateway => Some("Parallel Gateway"),
        ElementType::Other => None,
    }
}
