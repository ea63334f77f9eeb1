//! Editor view selection
//!
//! Holds which scene, external layout, and external events sheet are
//! currently open and decides which editor panels to mount for them.
//! Panels are handed the entity name plus a found/not-found resolution
//! against the borrowed project; a missing entity is the panel's own
//! "not found" presentation, not a selector error.

use crate::project::Project;

/// Which editor views are open: at most one per kind, switching replaces
/// the previous name (no stack).
#[derive(Debug, Clone, Default)]
pub struct EditorOpenState {
    scene: Option<String>,
    external_layout: Option<String>,
    external_events: Option<String>,
    /// Whether the project manager pane is shown
    pub project_manager_open: bool,
}

impl EditorOpenState {
    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    pub fn external_layout(&self) -> Option<&str> {
        self.external_layout.as_deref()
    }

    pub fn external_events(&self) -> Option<&str> {
        self.external_events.as_deref()
    }

    pub fn open_scene(&mut self, name: &str) {
        self.scene = Some(name.to_string());
    }

    pub fn close_scene(&mut self) {
        self.scene = None;
    }

    pub fn open_external_layout(&mut self, name: &str) {
        self.external_layout = Some(name.to_string());
    }

    pub fn close_external_layout(&mut self) {
        self.external_layout = None;
    }

    pub fn open_external_events(&mut self, name: &str) {
        self.external_events = Some(name.to_string());
    }

    pub fn close_external_events(&mut self) {
        self.external_events = None;
    }

    pub fn toggle_project_manager(&mut self) {
        self.project_manager_open = !self.project_manager_open;
    }
}

/// An editor panel to mount
#[derive(Debug, Clone, PartialEq)]
pub enum EditorPanel {
    /// Scene editor for a named layout
    Scene { name: String, found: bool },
    /// External layout editor
    ExternalLayout {
        name: String,
        found: bool,
        /// Layout the instances reference, when the entity exists
        associated_layout: Option<String>,
    },
    /// Events sheet for named external events
    EventsSheet { name: String },
}

impl EditorPanel {
    /// The panel's own "not found" presentation, when its entity is
    /// missing from the project
    pub fn placeholder(&self) -> Option<String> {
        match self {
            EditorPanel::Scene { name, found: false } => {
                Some(format!("Scene {} not found in project", name))
            }
            EditorPanel::ExternalLayout {
                name, found: false, ..
            } => Some(format!("External layout {} not found in project", name)),
            _ => None,
        }
    }
}

/// Decide which panels to mount for the open names. Scene editor and
/// events sheet are not mutually exclusive; the only selector-side guard
/// is the external-events existence check before mounting the sheet.
pub fn select_panels(project: &Project, state: &EditorOpenState) -> Vec<EditorPanel> {
    let mut panels = Vec::new();

    if let Some(name) = state.scene() {
        panels.push(EditorPanel::Scene {
            name: name.to_string(),
            found: project.has_layout(name),
        });
    }

    if let Some(name) = state.external_layout() {
        let layout = project.external_layout(name);
        panels.push(EditorPanel::ExternalLayout {
            name: name.to_string(),
            found: layout.is_some(),
            associated_layout: layout.and_then(|l| l.associated_layout.clone()),
        });
    }

    if let Some(name) = state.external_events() {
        if project.has_external_events(name) {
            panels.push(EditorPanel::EventsSheet {
                name: name.to_string(),
            });
        }
    }

    panels
}
