//! Synchronization controller tests
//!
//! Drive the controller with a recording transport double and a collecting
//! notice callback, covering the focus/blur push-pull cycle, stale response
//! handling, and local-only mode.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use scenelink::codec::{JsonCodec, ProjectCodec};
use scenelink::config::SyncBehaviorConfig;
use scenelink::controller::{
    EditorKind, LaunchOptions, Notice, SyncController, SyncState,
};
use scenelink::error::Result;
use scenelink::project::Project;
use scenelink::transport::{EditorTransport, TransportEvent, UpdateScope};

/// One outbound transport call
#[derive(Debug, Clone, PartialEq)]
enum Call {
    Request { scope: UpdateScope, token: u64 },
    Send { scope: UpdateScope, payload: String },
}

/// Transport double that records every outbound call
#[derive(Clone, Default)]
struct RecordingTransport {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingTransport {
    fn new() -> Self {
        Self::default()
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl EditorTransport for RecordingTransport {
    fn request_update(&mut self, scope: UpdateScope, token: u64) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Request { scope, token });
        Ok(())
    }

    fn send_payload(&mut self, payload: &str, scope: UpdateScope) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Send {
            scope,
            payload: payload.to_string(),
        });
        Ok(())
    }
}

fn controller_with_transport(
    launch: LaunchOptions,
) -> (SyncController, RecordingTransport, Arc<Mutex<Vec<Notice>>>) {
    let mut controller = SyncController::new(
        Box::new(JsonCodec::new()),
        launch,
        SyncBehaviorConfig::default(),
        Duration::from_secs(10),
    );

    let transport = RecordingTransport::new();
    controller.attach_transport(Box::new(transport.clone()));

    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notices);
    controller.on_notice(move |notice| sink.lock().unwrap().push(notice));

    (controller, transport, notices)
}

fn sample_snapshot() -> String {
    JsonCodec::new()
        .encode_project(&Project::builtin_sample())
        .unwrap()
}

fn full_update(payload: String, token: Option<u64>) -> TransportEvent {
    TransportEvent::UpdateReceived {
        payload,
        scope: UpdateScope::FullProject,
        token,
    }
}

#[test]
fn blur_with_no_scene_open_does_not_send() {
    let (mut controller, transport, _) = controller_with_transport(LaunchOptions::default());
    controller.handle_transport_event(full_update(sample_snapshot(), None));

    controller.handle_window_blur();

    assert!(transport.calls().is_empty());
}

#[test]
fn blur_with_open_scene_sends_instances_exactly_once() {
    let (mut controller, transport, _) = controller_with_transport(LaunchOptions::default());
    controller.handle_transport_event(full_update(sample_snapshot(), None));
    controller.views_mut().open_scene("Level1");

    controller.handle_window_blur();

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        Call::Send { scope, payload } => {
            assert_eq!(*scope, UpdateScope::Instances);
            // Payload is the open scene's instances
            let instances = JsonCodec::new().decode_instances(payload).unwrap();
            assert_eq!(instances.len(), 2);
        }
        other => panic!("unexpected call: {:?}", other),
    }
    assert_eq!(controller.stats().instance_pushes, 1);
}

#[test]
fn blur_with_vanished_scene_does_not_send() {
    let (mut controller, transport, _) = controller_with_transport(LaunchOptions::default());
    controller.handle_transport_event(full_update(sample_snapshot(), None));
    controller.views_mut().open_scene("DeletedScene");

    controller.handle_window_blur();

    assert!(transport.calls().is_empty());
}

#[test]
fn focus_requests_full_update_regardless_of_state() {
    let (mut controller, transport, _) = controller_with_transport(LaunchOptions::default());

    // Idle
    controller.handle_window_focus();
    // Ready
    controller.handle_transport_event(full_update(sample_snapshot(), Some(1)));
    controller.handle_window_focus();

    let calls = transport.calls();
    assert_eq!(
        calls,
        vec![
            Call::Request {
                scope: UpdateScope::FullProject,
                token: 1,
            },
            Call::Request {
                scope: UpdateScope::FullProject,
                token: 2,
            },
        ]
    );
}

#[test]
fn instances_update_from_editor_is_dropped() {
    let (mut controller, _, notices) = controller_with_transport(LaunchOptions::default());
    controller.handle_transport_event(full_update(sample_snapshot(), None));
    let name_before = controller.project().unwrap().name.clone();

    controller.handle_transport_event(TransportEvent::UpdateReceived {
        payload: "[]".to_string(),
        scope: UpdateScope::Instances,
        token: None,
    });

    assert_eq!(controller.state(), SyncState::Ready);
    assert_eq!(controller.project().unwrap().name, name_before);
    assert_eq!(controller.stats().instance_updates_dropped, 1);
    assert!(notices
        .lock()
        .unwrap()
        .contains(&Notice::InstanceUpdateDropped));
}

#[test]
fn local_only_launch_does_not_open_scene() {
    // Launch with scene-editor arguments but no transport: the controller
    // stays local-only and nothing opens until the operator does it.
    let mut controller = SyncController::new(
        Box::new(JsonCodec::new()),
        LaunchOptions {
            editor: Some(EditorKind::SceneEditor),
            edited_element_name: Some("Level1".to_string()),
        },
        SyncBehaviorConfig::default(),
        Duration::from_secs(10),
    );

    assert!(controller.is_local_only());
    assert_eq!(controller.state(), SyncState::Idle);
    assert_eq!(controller.views().scene(), None);

    controller.handle_window_focus();
    assert_eq!(controller.views().scene(), None);

    controller.load_builtin_project();
    controller.views_mut().open_scene("Level1");
    assert_eq!(controller.views().scene(), Some("Level1"));
}

#[test]
fn first_full_update_applies_and_auto_opens_scene() {
    let (mut controller, _, notices) = controller_with_transport(LaunchOptions {
        editor: Some(EditorKind::SceneEditor),
        edited_element_name: Some("Level1".to_string()),
    });
    assert_eq!(controller.state(), SyncState::Idle);

    controller.handle_transport_event(full_update(sample_snapshot(), None));

    assert_eq!(controller.state(), SyncState::Ready);
    assert!(controller.project().is_some());
    assert_eq!(controller.views().scene(), Some("Level1"));

    // Idle -> Loading -> Ready shows and hides the loading indicator
    let notices = notices.lock().unwrap();
    let started = notices
        .iter()
        .position(|n| *n == Notice::LoadingStarted)
        .unwrap();
    let finished = notices
        .iter()
        .position(|n| *n == Notice::LoadingFinished)
        .unwrap();
    assert!(started < finished);
}

#[test]
fn auto_open_external_layout_editor() {
    let (mut controller, _, _) = controller_with_transport(LaunchOptions {
        editor: Some(EditorKind::ExternalLayoutEditor),
        edited_element_name: Some("Level1Decorations".to_string()),
    });

    controller.handle_transport_event(full_update(sample_snapshot(), None));

    assert_eq!(
        controller.views().external_layout(),
        Some("Level1Decorations")
    );
    assert_eq!(controller.views().scene(), None);
}

#[test]
fn overlapping_requests_apply_latest_response_once() {
    let (mut controller, transport, _) = controller_with_transport(LaunchOptions::default());

    // Two rapid focus events issue two update requests
    controller.handle_window_focus();
    controller.handle_window_focus();
    assert_eq!(transport.calls().len(), 2);

    // The single response answers the latest request
    controller.handle_transport_event(full_update(sample_snapshot(), Some(2)));

    assert_eq!(controller.state(), SyncState::Ready);
    assert_eq!(controller.stats().updates_applied, 1);
    assert_eq!(controller.stats().stale_responses_discarded, 0);
}

#[test]
fn stale_response_is_discarded() {
    let (mut controller, _, notices) = controller_with_transport(LaunchOptions::default());

    controller.handle_window_focus(); // token 1
    controller.handle_window_focus(); // token 2

    // The answer to the superseded request must not touch the project
    controller.handle_transport_event(full_update(sample_snapshot(), Some(1)));

    assert_eq!(controller.state(), SyncState::Loading);
    assert!(controller.project().is_none());
    assert_eq!(controller.stats().stale_responses_discarded, 1);
    assert!(notices
        .lock()
        .unwrap()
        .contains(&Notice::StaleResponseDiscarded { token: 1 }));

    // The current one still applies
    controller.handle_transport_event(full_update(sample_snapshot(), Some(2)));
    assert_eq!(controller.state(), SyncState::Ready);
    assert_eq!(controller.stats().updates_applied, 1);
}

#[test]
fn request_timeout_surfaces_and_unsticks() {
    let (mut controller, _, notices) = controller_with_transport(LaunchOptions::default());

    controller.handle_window_focus();
    assert_eq!(controller.state(), SyncState::Loading);

    controller.check_timeout(Instant::now() + Duration::from_secs(60));

    // No project yet, so the timeout falls back to Idle
    assert_eq!(controller.state(), SyncState::Idle);
    assert_eq!(controller.stats().timeouts, 1);
    assert!(notices
        .lock()
        .unwrap()
        .iter()
        .any(|n| matches!(n, Notice::SyncFailed { .. })));
}

#[test]
fn decode_failure_reports_and_keeps_state() {
    let (mut controller, _, notices) = controller_with_transport(LaunchOptions::default());
    controller.handle_transport_event(full_update(sample_snapshot(), None));

    controller.handle_transport_event(full_update("{garbage".to_string(), None));

    assert_eq!(controller.state(), SyncState::Ready);
    assert!(controller.project().is_some());
    assert!(notices
        .lock()
        .unwrap()
        .iter()
        .any(|n| matches!(n, Notice::SyncFailed { .. })));
}

#[test]
fn show_request_raises_window_without_state_change() {
    let (mut controller, _, notices) = controller_with_transport(LaunchOptions::default());
    controller.handle_transport_event(full_update(sample_snapshot(), None));

    controller.handle_transport_event(TransportEvent::ShowRequested);

    assert_eq!(controller.state(), SyncState::Ready);
    assert!(notices.lock().unwrap().contains(&Notice::RaiseWindow));
}
