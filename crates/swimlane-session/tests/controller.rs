//! Session lifecycle against a scripted engine.

use std::sync::Arc;
use std::time::Duration;

use swimlane_core::{ElementType, MemoryStore, Slot, SlotStore, DEFAULT_TEMPLATE};
use swimlane_session::fakes::{EngineCommand, ScriptedEngine, UnavailableStore};
use swimlane_session::{
    DiagramSession, ElementPatch, EngineError, EngineEvent, NotificationKind, SelectedElement,
    SessionConfig, SessionError, SessionState,
};

const PROCESS: &str = r#"{
  "id": "Onboarding",
  "elements": [
    {"id": "S", "type": "startEvent", "name": "Start onboarding"},
    {"id": "T", "type": "userTask", "name": "Implement account"},
    {"id": "E", "type": "endEvent", "name": "Complete"}
  ],
  "flows": [
    {"id": "F1", "sourceRef": "S", "targetRef": "T"},
    {"id": "F2", "sourceRef": "T", "targetRef": "E"}
  ]
}"#;

fn session(store: Arc<MemoryStore>) -> DiagramSession<ScriptedEngine, Arc<MemoryStore>> {
    DiagramSession::new(ScriptedEngine::new(), store, SessionConfig::default())
}

fn kinds<E, S>(session: &DiagramSession<E, S>) -> Vec<NotificationKind>
where
    E: swimlane_session::DiagramEngine,
    S: SlotStore,
{
    session
        .notifications()
        .list()
        .into_iter()
        .map(|n| n.kind)
        .collect()
}

#[tokio::test]
async fn empty_storage_loads_template() {
    let store = Arc::new(MemoryStore::new());
    let mut session = session(store.clone());
    assert_eq!(session.state(), SessionState::Uninitialized);

    assert_eq!(session.load().await.unwrap(), SessionState::Ready);
    assert_eq!(session.engine().imports(), vec![DEFAULT_TEMPLATE.to_string()]);
    assert!(session.notifications().list().is_empty());
}

#[tokio::test]
async fn pending_process_is_compiled_persisted_and_consumed() {
    let store = Arc::new(MemoryStore::new());
    store.set(Slot::PendingProcess, PROCESS).unwrap();
    let mut session = session(store.clone());

    assert_eq!(session.load().await.unwrap(), SessionState::Ready);

    let imported = session.engine().imports();
    assert_eq!(imported.len(), 1);
    assert!(imported[0].contains(r#"<bpmn2:task id="T" name="Implement account" />"#));
    assert_eq!(store.get(Slot::Diagram).unwrap(), Some(imported[0].clone()));
    assert_eq!(store.get(Slot::PendingProcess).unwrap(), None);
    assert_eq!(kinds(&session), vec![NotificationKind::Success]);
}

#[tokio::test]
async fn pending_process_wins_over_saved_diagram() {
    let store = Arc::new(MemoryStore::new());
    store.set(Slot::Diagram, DEFAULT_TEMPLATE).unwrap();
    store.set(Slot::PendingProcess, PROCESS).unwrap();
    let mut session = session(store);

    session.load().await.unwrap();
    let imported = session.engine().imports();
    assert_eq!(imported.len(), 1);
    assert!(imported[0].contains(r#"id="Onboarding""#));
}

#[tokio::test]
async fn malformed_pending_json_falls_back_to_template() {
    let store = Arc::new(MemoryStore::new());
    store.set(Slot::PendingProcess, "the model said no").unwrap();
    let mut session = session(store.clone());

    assert_eq!(session.load().await.unwrap(), SessionState::Ready);
    assert_eq!(session.engine().imports(), vec![DEFAULT_TEMPLATE.to_string()]);
    assert_eq!(store.get(Slot::PendingProcess).unwrap(), None);
    assert_eq!(kinds(&session), vec![NotificationKind::Warning]);
}

#[tokio::test]
async fn rejected_pending_process_is_cleared() {
    let store = Arc::new(MemoryStore::new());
    store.set(Slot::PendingProcess, PROCESS).unwrap();
    let engine = ScriptedEngine::new();
    engine.reject_containing(r#"id="Onboarding""#);
    let mut session = DiagramSession::new(engine, store.clone(), SessionConfig::default());

    assert_eq!(session.load().await.unwrap(), SessionState::Ready);
    assert_eq!(session.engine().current().as_deref(), Some(DEFAULT_TEMPLATE));
    assert_eq!(store.get(Slot::PendingProcess).unwrap(), None);
    assert_eq!(store.get(Slot::Diagram).unwrap(), None);
    assert_eq!(kinds(&session), vec![NotificationKind::Warning]);
}

#[tokio::test]
async fn saved_diagram_is_restored() {
    let store = Arc::new(MemoryStore::new());
    let saved = swimlane_core::compile(swimlane_core::parse_process_json(PROCESS).unwrap());
    store.set(Slot::Diagram, &saved).unwrap();
    let mut session = session(store);

    session.load().await.unwrap();
    assert_eq!(session.engine().imports(), vec![saved]);
    assert_eq!(kinds(&session), vec![NotificationKind::Success]);
}

#[tokio::test]
async fn corrupt_saved_diagram_is_cleared() {
    let store = Arc::new(MemoryStore::new());
    store.set(Slot::Diagram, "<bpmn2:definitions><unclosed>").unwrap();
    let mut session = session(store.clone());

    assert_eq!(session.load().await.unwrap(), SessionState::Ready);
    assert_eq!(session.engine().current().as_deref(), Some(DEFAULT_TEMPLATE));
    assert_eq!(store.get(Slot::Diagram).unwrap(), None);
    assert_eq!(kinds(&session), vec![NotificationKind::Warning]);
}

#[tokio::test]
async fn rejected_template_is_the_only_hard_failure() {
    let engine = ScriptedEngine::new();
    engine.reject_containing("bpmn2:definitions");
    let mut session =
        DiagramSession::new(engine, Arc::new(MemoryStore::new()), SessionConfig::default());

    let err = session.load().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::TemplateRejected(EngineError::ImportRejected(_))
    ));
}

#[tokio::test]
async fn edits_mark_modified_and_save_persists_verbatim() {
    let store = Arc::new(MemoryStore::new());
    let mut session = session(store.clone());
    session.load().await.unwrap();

    let edited = DEFAULT_TEMPLATE.replace("StartEvent_1", "StartEvent_9");
    session.engine().edit(&edited);
    assert_eq!(session.pump_events(), 1);
    assert_eq!(session.state(), SessionState::Modified);

    let xml = session.save().await.unwrap();
    assert_eq!(xml, edited);
    assert_eq!(session.state(), SessionState::Saved);
    assert_eq!(store.get(Slot::Diagram).unwrap(), Some(edited));

    let stamp = store.get(Slot::DiagramTimestamp).unwrap().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());

    // a later edit puts the session back to modified
    session.engine().edit(DEFAULT_TEMPLATE);
    session.pump_events();
    assert_eq!(session.state(), SessionState::Modified);
}

#[tokio::test]
async fn edits_before_load_do_not_change_state() {
    let mut session = session(Arc::new(MemoryStore::new()));
    session.engine().edit(DEFAULT_TEMPLATE);
    session.pump_events();
    assert_eq!(session.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn export_returns_current_xml() {
    let mut session = session(Arc::new(MemoryStore::new()));
    session.load().await.unwrap();
    let xml = session.export().await.unwrap();
    assert_eq!(xml, DEFAULT_TEMPLATE);
    assert_eq!(session.state(), SessionState::Exported);
}

#[tokio::test]
async fn engine_save_failure_is_reported() {
    let store = Arc::new(MemoryStore::new());
    let mut session = session(store.clone());
    session.load().await.unwrap();
    session.engine().fail_saves();

    assert!(matches!(
        session.save().await,
        Err(SessionError::Engine(EngineError::SaveFailed(_)))
    ));
    assert!(session.export().await.is_err());
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(store.get(Slot::Diagram).unwrap(), None);
    assert_eq!(
        kinds(&session),
        vec![NotificationKind::Error, NotificationKind::Error]
    );
}

#[tokio::test]
async fn unavailable_storage_never_blocks_the_diagram() {
    let mut session =
        DiagramSession::new(ScriptedEngine::new(), UnavailableStore, SessionConfig::default());

    assert_eq!(session.load().await.unwrap(), SessionState::Ready);
    assert!(kinds(&session).contains(&NotificationKind::Error));

    assert_eq!(
        session.import_process(PROCESS).await.unwrap(),
        SessionState::Ready
    );
    assert!(session
        .engine()
        .current()
        .unwrap()
        .contains(r#"id="Onboarding""#));

    let xml = session.save().await.unwrap();
    assert!(xml.contains(r#"id="Onboarding""#));
    assert_ne!(session.state(), SessionState::Saved);
}

#[tokio::test]
async fn import_process_accepts_prose_wrapped_json() {
    let store = Arc::new(MemoryStore::new());
    let mut session = session(store.clone());
    session.load().await.unwrap();

    let reply = format!("Here is your process:\n```json\n{PROCESS}\n```\nEnjoy!");
    session.import_process(&reply).await.unwrap();

    let summary = session.json_view().await.unwrap();
    assert_eq!(summary.id, "Onboarding");
    let ids: Vec<_> = summary.elements.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["LaneSet_1", "S", "T", "E", "F1", "F2"]);
    assert_eq!(summary.elements[2].kind, "task");
    assert!(store.get(Slot::Diagram).unwrap().is_some());
}

#[tokio::test]
async fn failed_imports_fall_back_to_template() {
    let mut session = session(Arc::new(MemoryStore::new()));
    session.load().await.unwrap();

    session.import_process("[1, 2, 3]").await.unwrap();
    assert_eq!(session.engine().current().as_deref(), Some(DEFAULT_TEMPLATE));

    session.import_diagram("<not-bpmn").await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(
        kinds(&session),
        vec![NotificationKind::Warning, NotificationKind::Warning]
    );
}

#[tokio::test]
async fn create_new_replaces_current_diagram() {
    let mut session = session(Arc::new(MemoryStore::new()));
    session.import_process(PROCESS).await.unwrap();
    session.create_new().await.unwrap();
    assert_eq!(session.engine().current().as_deref(), Some(DEFAULT_TEMPLATE));
    assert_eq!(session.engine().imports().len(), 2);
}

#[tokio::test]
async fn selection_follows_engine_events() {
    let mut session = session(Arc::new(MemoryStore::new()));
    session.load().await.unwrap();

    let picked = SelectedElement {
        id: "StartEvent_1".into(),
        name: "Start".into(),
        kind: "bpmn:StartEvent".into(),
        documentation: String::new(),
    };
    session
        .engine()
        .emit(EngineEvent::SelectionChanged(Some(picked.clone())));
    session.pump_events();
    assert_eq!(session.selected(), Some(&picked));
    assert_eq!(session.state(), SessionState::Ready);

    session.engine().emit(EngineEvent::SelectionChanged(None));
    session.pump_events();
    assert_eq!(session.selected(), None);
}

#[tokio::test(start_paused = true)]
async fn notifications_expire_without_blocking() {
    let mut session = DiagramSession::new(
        ScriptedEngine::new(),
        Arc::new(MemoryStore::new()),
        SessionConfig {
            notification_duration: Duration::from_secs(2),
            ..SessionConfig::default()
        },
    );
    session.create_new().await.unwrap();
    assert_eq!(session.notifications().list().len(), 1);

    tokio::time::sleep(Duration::from_millis(2001)).await;
    assert!(session.notifications().list().is_empty());
}

fn start_event() -> SelectedElement {
    SelectedElement {
        id: "StartEvent_1".into(),
        name: String::new(),
        kind: "bpmn:StartEvent".into(),
        documentation: String::new(),
    }
}

async fn loaded_with_selection() -> DiagramSession<ScriptedEngine, Arc<MemoryStore>> {
    let mut session = session(Arc::new(MemoryStore::new()));
    session.load().await.unwrap();
    session
        .engine()
        .emit(EngineEvent::SelectionChanged(Some(start_event())));
    session.pump_events();
    session
}

#[tokio::test]
async fn renaming_the_selection_goes_through_the_engine() {
    let mut session = loaded_with_selection().await;

    assert!(session
        .update_selected(ElementPatch::rename("Kickoff"))
        .await
        .unwrap());
    assert_eq!(session.selected().unwrap().name, "Kickoff");
    assert_eq!(session.selected().unwrap().id, "StartEvent_1");
    assert_eq!(
        session.engine().commands(),
        vec![EngineCommand::UpdateProperties {
            id: "StartEvent_1".into(),
            patch: ElementPatch::rename("Kickoff"),
        }]
    );

    let notes = session.notifications().list();
    assert_eq!(notes.last().unwrap().message, "Element properties updated");
    assert_eq!(notes.last().unwrap().kind, NotificationKind::Success);

    // the engine reports the edit like any other command
    session.pump_events();
    assert_eq!(session.state(), SessionState::Modified);
}

#[tokio::test]
async fn changing_the_id_moves_the_selection() {
    let mut session = loaded_with_selection().await;

    session
        .update_selected(ElementPatch::reid("Begin"))
        .await
        .unwrap();
    assert_eq!(session.selected().unwrap().id, "Begin");
    assert!(session.engine().has_element("Begin"));
    assert!(!session.engine().has_element("StartEvent_1"));

    // follow-up edits target the new id
    session
        .update_selected(ElementPatch::rename("Go"))
        .await
        .unwrap();
    assert!(matches!(
        session.engine().commands().last(),
        Some(EngineCommand::UpdateProperties { id, .. }) if id == "Begin"
    ));
}

#[tokio::test]
async fn unchanged_id_sends_no_command() {
    let mut session = loaded_with_selection().await;
    assert!(session
        .update_selected(ElementPatch::reid("StartEvent_1"))
        .await
        .unwrap());
    assert!(session.engine().commands().is_empty());
}

#[tokio::test]
async fn update_without_selection_is_a_no_op() {
    let mut session = session(Arc::new(MemoryStore::new()));
    session.load().await.unwrap();

    assert!(!session
        .update_selected(ElementPatch::rename("Nobody"))
        .await
        .unwrap());
    assert!(session.engine().commands().is_empty());
    assert!(session.notifications().list().is_empty());
}

#[tokio::test]
async fn refused_update_keeps_selection_and_state() {
    let mut session = loaded_with_selection().await;
    session.engine().fail_commands();

    let err = session
        .update_selected(ElementPatch::rename("Kickoff"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Engine(EngineError::CommandFailed(_))
    ));
    assert_eq!(session.selected(), Some(&start_event()));
    session.pump_events();
    assert_eq!(session.state(), SessionState::Ready);

    let notes = session.notifications().list();
    assert_eq!(notes.last().unwrap().message, "Failed to update element properties");
    assert_eq!(notes.last().unwrap().kind, NotificationKind::Error);
}

#[tokio::test]
async fn stale_selection_is_reported() {
    let mut session = session(Arc::new(MemoryStore::new()));
    session.load().await.unwrap();
    session.handle_event(EngineEvent::SelectionChanged(Some(SelectedElement {
        id: "Ghost".into(),
        ..start_event()
    })));

    assert!(matches!(
        session.update_selected(ElementPatch::rename("x")).await,
        Err(SessionError::Engine(EngineError::UnknownElement(id))) if id == "Ghost"
    ));
}

#[tokio::test]
async fn palette_tools_create_shapes() {
    let mut session = session(Arc::new(MemoryStore::new()));
    session.load().await.unwrap();

    let id = session.create_shape(ElementType::Task).await.unwrap();
    assert_eq!(id.as_deref(), Some("Shape_1"));
    assert!(session.engine().has_element("Shape_1"));
    assert_eq!(
        session.engine().commands(),
        vec![EngineCommand::CreateShape {
            kind: ElementType::Task,
            id: "Shape_1".into(),
        }]
    );
    let hint = session.notifications().list().pop().unwrap();
    assert_eq!(hint.message, "Task tool activated - click to place");
    assert_eq!(hint.duration_ms, 2000);

    assert_eq!(session.create_shape(ElementType::Other).await.unwrap(), None);
    assert_eq!(session.engine().commands().len(), 1);
    assert_eq!(
        session.notifications().list().pop().unwrap().kind,
        NotificationKind::Warning
    );

    session.engine().fail_commands();
    assert!(session.create_shape(ElementType::ExclusiveGateway).await.is_err());
    assert_eq!(
        session.notifications().list().pop().unwrap().message,
        "Tool activation failed"
    );
}
