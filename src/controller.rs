//! Synchronization controller
//!
//! Decides when to request an update from the external editor, when to
//! apply a received snapshot, and which editor view to focus afterward.
//! Single-threaded and cooperative: every handler is called from one event
//! loop, never concurrently, so no locking is needed.
//!
//! The controller's phase is an explicit tagged state (`Idle`, `Loading`,
//! `Ready`) instead of a loading flag next to a nullable project, and every
//! outbound update request carries a monotonically increasing token that the
//! peer echoes back, so responses to superseded requests can be recognized
//! and discarded.

use crate::codec::ProjectCodec;
use crate::config::SyncBehaviorConfig;
use crate::error::{BridgeError, Result};
use crate::project::Project;
use crate::transport::{EditorTransport, TransportEvent, UpdateScope};
use crate::views::EditorOpenState;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Editor kind to auto-open once the first full project arrives,
/// taken from the launch arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    SceneEditor,
    ExternalLayoutEditor,
}

impl FromStr for EditorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scene-editor" => Ok(EditorKind::SceneEditor),
            "external-layout-editor" => Ok(EditorKind::ExternalLayoutEditor),
            other => Err(format!("unknown editor kind: {}", other)),
        }
    }
}

impl std::fmt::Display for EditorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditorKind::SceneEditor => write!(f, "scene-editor"),
            EditorKind::ExternalLayoutEditor => write!(f, "external-layout-editor"),
        }
    }
}

/// Launch arguments relevant to synchronization, read once at startup
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Editor kind to auto-open after the first full update
    pub editor: Option<EditorKind>,
    /// Name of the element to auto-open
    pub edited_element_name: Option<String>,
}

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No project loaded
    Idle,
    /// Update requested or being applied
    Loading,
    /// Project loaded, editor views may be open
    Ready,
}

/// Side effects surfaced to whoever hosts the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Show the loading indicator
    LoadingStarted,
    /// Hide the loading indicator
    LoadingFinished,
    /// A new project replaced the previous one
    ProjectReplaced { name: String },
    /// The editor asked for this window to be brought to the foreground
    RaiseWindow,
    /// An instances-scope update arrived and was dropped
    InstanceUpdateDropped,
    /// A response to a superseded request was discarded
    StaleResponseDiscarded { token: u64 },
    /// The open scene's instances were pushed to the editor
    InstancesPushed { layout: String },
    /// A synchronization step failed
    SyncFailed { error: String },
}

/// Statistics about synchronization operations
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Full project updates applied
    pub updates_applied: u64,
    /// Responses discarded because their token was superseded
    pub stale_responses_discarded: u64,
    /// Inbound instances-scope updates dropped
    pub instance_updates_dropped: u64,
    /// Instances pushed on blur
    pub instance_pushes: u64,
    /// Update requests that timed out
    pub timeouts: u64,
    /// Last successful update application
    pub last_sync: Option<DateTime<Utc>>,
    /// Last error
    pub last_error: Option<String>,
}

/// Outstanding request bookkeeping while in `Loading`
#[derive(Debug, Clone, Copy)]
struct Pending {
    /// Token the next applicable response must echo; `None` while an
    /// unsolicited snapshot is being applied.
    token: Option<u64>,
    deadline: Instant,
}

/// The synchronization controller
pub struct SyncController {
    /// Snapshot codec, injected so tests can substitute a double
    codec: Box<dyn ProjectCodec>,

    /// Outbound channel to the external editor; `None` = local-only mode
    transport: Option<Box<dyn EditorTransport>>,

    /// The one live project, exclusively owned here
    project: Option<Project>,

    state: SyncState,
    pending: Option<Pending>,

    /// Which editor views are open
    views: EditorOpenState,

    launch: LaunchOptions,
    behavior: SyncBehaviorConfig,
    request_timeout: Duration,

    /// Auto-open from launch arguments happens after the first full update
    auto_open_pending: bool,

    next_token: u64,
    stats: SyncStats,

    notice_callback: Option<Box<dyn Fn(Notice) + Send + Sync>>,
}

impl SyncController {
    /// Create a controller in local-only mode (no external editor)
    pub fn new(
        codec: Box<dyn ProjectCodec>,
        launch: LaunchOptions,
        behavior: SyncBehaviorConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            codec,
            transport: None,
            project: None,
            state: SyncState::Idle,
            pending: None,
            views: EditorOpenState::default(),
            launch,
            behavior,
            request_timeout,
            auto_open_pending: true,
            next_token: 1,
            stats: SyncStats::default(),
            notice_callback: None,
        }
    }

    /// Attach a connected transport, leaving local-only mode
    pub fn attach_transport(&mut self, transport: Box<dyn EditorTransport>) {
        self.transport = Some(transport);
    }

    /// Set the side-effect callback
    pub fn on_notice<F>(&mut self, callback: F)
    where
        F: Fn(Notice) + Send + Sync + 'static,
    {
        self.notice_callback = Some(Box::new(callback));
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Borrow the live project for the duration of a render
    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn views(&self) -> &EditorOpenState {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut EditorOpenState {
        &mut self.views
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.clone()
    }

    /// Whether the controller runs without an external editor
    pub fn is_local_only(&self) -> bool {
        self.transport.is_none()
    }

    // ============================================
    // Transport events
    // ============================================

    /// Feed one inbound transport event
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                info!("external editor connected");
            }
            TransportEvent::UpdateReceived {
                payload,
                scope,
                token,
            } => self.handle_update(payload, scope, token),
            TransportEvent::ShowRequested => {
                debug!("editor requested window raise");
                self.emit(Notice::RaiseWindow);
            }
            TransportEvent::Disconnected => {
                warn!("external editor disconnected");
                self.record_error("external editor disconnected");
            }
            TransportEvent::Error(message) => {
                warn!(error = %message, "transport error");
                self.record_error(&message);
            }
        }
    }

    fn handle_update(&mut self, payload: String, scope: UpdateScope, token: Option<u64>) {
        if scope == UpdateScope::Instances {
            // Instance-only updates from the editor are acknowledged but
            // dropped: applying them to the open scene is deferred pending
            // product clarification. The project must not change here.
            warn!("instances-scope update from editor is not applied");
            self.stats.instance_updates_dropped += 1;
            self.emit(Notice::InstanceUpdateDropped);
            return;
        }

        // A tokened response is only applicable if it answers the
        // outstanding request; anything else was superseded (by a newer
        // request or a timeout) and is discarded.
        if let Some(token) = token {
            let expected = self.pending.and_then(|p| p.token);
            if expected != Some(token) {
                warn!(token, ?expected, "discarding stale update response");
                self.stats.stale_responses_discarded += 1;
                self.emit(Notice::StaleResponseDiscarded { token });
                return;
            }
        }

        self.apply_project_snapshot(&payload);
    }

    fn apply_project_snapshot(&mut self, snapshot: &str) {
        self.enter_loading(None);

        match self.codec.decode_project(snapshot) {
            Ok(project) => self.install_project(project),
            Err(e) => {
                warn!(error = %e, "failed to decode project snapshot");
                self.record_error(&e.to_string());
                self.emit(Notice::SyncFailed {
                    error: e.to_string(),
                });
                self.leave_loading();
            }
        }
    }

    fn install_project(&mut self, project: Project) {
        // Ownership transfer, not a merge: the previous project is
        // disposed before the new one is installed.
        if let Some(previous) = self.project.take() {
            debug!(name = %previous.name, "disposing previous project");
            drop(previous);
        }

        let name = project.name.clone();
        self.project = Some(project);
        self.stats.updates_applied += 1;
        self.stats.last_sync = Some(Utc::now());
        info!(%name, "project replaced from editor snapshot");

        self.pending = None;
        self.state = SyncState::Ready;
        self.emit(Notice::LoadingFinished);
        self.emit(Notice::ProjectReplaced { name });

        self.run_auto_open();
    }

    /// Honor the launch arguments once the first full project is in
    fn run_auto_open(&mut self) {
        if !self.auto_open_pending {
            return;
        }
        self.auto_open_pending = false;

        let Some(name) = self.launch.edited_element_name.clone() else {
            return;
        };
        match self.launch.editor {
            Some(EditorKind::SceneEditor) => {
                info!(scene = %name, "auto-opening scene from launch arguments");
                self.views.open_scene(&name);
            }
            Some(EditorKind::ExternalLayoutEditor) => {
                info!(layout = %name, "auto-opening external layout from launch arguments");
                self.views.open_external_layout(&name);
            }
            None => {}
        }
    }

    // ============================================
    // Window events
    // ============================================

    /// The window gained focus: pull the full project again
    pub fn handle_window_focus(&mut self) {
        if !self.behavior.pull_on_focus {
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        let token = self.next_token;
        self.next_token += 1;

        debug!(token, "window focused, requesting full update");
        if let Err(e) = transport.request_update(UpdateScope::FullProject, token) {
            warn!(error = %e, "update request failed");
            self.record_error(&e.to_string());
            self.emit(Notice::SyncFailed {
                error: e.to_string(),
            });
            return;
        }

        self.enter_loading(Some(token));
    }

    /// The window lost focus: push the open scene's instances, best effort
    pub fn handle_window_blur(&mut self) {
        if !self.behavior.push_instances_on_blur {
            return;
        }
        if self.transport.is_none() {
            return;
        }

        let Some(scene_name) = self.views.scene().map(str::to_string) else {
            return;
        };
        let Some(layout) = self.project.as_ref().and_then(|p| p.layout(&scene_name)) else {
            debug!(scene = %scene_name, "open scene not in project, nothing to push");
            return;
        };

        let snapshot = match self.codec.encode_instances(layout) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "failed to encode instances");
                self.record_error(&e.to_string());
                return;
            }
        };

        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        match transport.send_payload(&snapshot, UpdateScope::Instances) {
            Ok(()) => {
                debug!(scene = %scene_name, "pushed instances on blur");
                self.stats.instance_pushes += 1;
                self.emit(Notice::InstancesPushed { layout: scene_name });
            }
            Err(e) => {
                // Best-effort push, not guaranteed delivery
                warn!(error = %e, "instances push failed");
                self.record_error(&e.to_string());
            }
        }
    }

    // ============================================
    // Timeouts
    // ============================================

    /// Check whether the outstanding request has exceeded its deadline.
    /// Called periodically by the event loop; a non-responding peer must
    /// not leave the controller loading forever.
    pub fn check_timeout(&mut self, now: Instant) {
        let Some(pending) = self.pending else {
            return;
        };
        if now < pending.deadline {
            return;
        }

        let token = pending.token.unwrap_or(0);
        warn!(token, "update request timed out");
        self.stats.timeouts += 1;
        let error = BridgeError::RequestTimeout { token };
        self.record_error(&error.to_string());
        self.emit(Notice::SyncFailed {
            error: error.to_string(),
        });
        self.leave_loading();
    }

    // ============================================
    // Local-only operations
    // ============================================

    /// Load the builtin sample project (local-only escape hatch)
    pub fn load_builtin_project(&mut self) {
        info!("loading builtin project");
        self.install_project(Project::builtin_sample());
    }

    /// Open a project snapshot from a file on disk
    pub fn open_project_file(&mut self, path: &Path) -> Result<()> {
        let snapshot = std::fs::read_to_string(path)?;
        let project = self.codec.decode_project(&snapshot)?;
        self.install_project(project);
        Ok(())
    }

    // ============================================
    // Internals
    // ============================================

    fn enter_loading(&mut self, token: Option<u64>) {
        self.pending = Some(Pending {
            token,
            deadline: Instant::now() + self.request_timeout,
        });
        if self.state != SyncState::Loading {
            self.state = SyncState::Loading;
            self.emit(Notice::LoadingStarted);
        }
    }

    fn leave_loading(&mut self) {
        self.pending = None;
        self.state = if self.project.is_some() {
            SyncState::Ready
        } else {
            SyncState::Idle
        };
        self.emit(Notice::LoadingFinished);
    }

    fn record_error(&mut self, message: &str) {
        self.stats.last_error = Some(message.to_string());
    }

    fn emit(&self, notice: Notice) {
        if let Some(ref callback) = self.notice_callback {
            callback(notice);
        }
    }
}
