//! Live project data model
//!
//! The project graph exchanged with the external editor: scenes (layouts)
//! with their placed object instances, plus external layouts and external
//! events. The controller owns exactly one live `Project` at a time; every
//! other component borrows it for the duration of a render.

use serde::{Deserialize, Serialize};

/// A placed object instance inside a layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Name of the object this instance is placed from
    pub object_name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub z_order: i32,
    /// Layer the instance lives on (empty = base layer)
    #[serde(default)]
    pub layer: String,
    #[serde(default)]
    pub locked: bool,
}

impl Instance {
    pub fn new(object_name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            object_name: object_name.into(),
            x,
            y,
            angle: 0.0,
            z_order: 0,
            layer: String::new(),
            locked: false,
        }
    }
}

/// A scene: a named layout with placed instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

impl Layout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
        }
    }
}

/// Instances placed outside any scene, associated to one at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalLayout {
    pub name: String,
    /// Layout whose objects these instances reference
    #[serde(default)]
    pub associated_layout: Option<String>,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

/// A named external events sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEvents {
    pub name: String,
    #[serde(default)]
    pub associated_layout: Option<String>,
}

/// The whole project graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub layouts: Vec<Layout>,
    #[serde(default)]
    pub external_layouts: Vec<ExternalLayout>,
    #[serde(default)]
    pub external_events: Vec<ExternalEvents>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layouts: Vec::new(),
            external_layouts: Vec::new(),
            external_events: Vec::new(),
        }
    }

    /// Look up a layout by name
    pub fn layout(&self, name: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.name == name)
    }

    /// Look up a layout by name, mutably
    pub fn layout_mut(&mut self, name: &str) -> Option<&mut Layout> {
        self.layouts.iter_mut().find(|l| l.name == name)
    }

    pub fn has_layout(&self, name: &str) -> bool {
        self.layout(name).is_some()
    }

    pub fn external_layout(&self, name: &str) -> Option<&ExternalLayout> {
        self.external_layouts.iter().find(|l| l.name == name)
    }

    pub fn has_external_layout(&self, name: &str) -> bool {
        self.external_layout(name).is_some()
    }

    pub fn external_events(&self, name: &str) -> Option<&ExternalEvents> {
        self.external_events.iter().find(|e| e.name == name)
    }

    pub fn has_external_events(&self, name: &str) -> bool {
        self.external_events(name).is_some()
    }

    /// Builtin sample project for local-only mode, when no external
    /// editor is reachable and nothing has been opened yet.
    pub fn builtin_sample() -> Self {
        let mut level = Layout::new("Level1");
        level.instances.push(Instance::new("Player", 100.0, 200.0));
        level.instances.push(Instance::new("Platform", 0.0, 400.0));

        let menu = Layout::new("Menu");

        Self {
            name: "Builtin game".to_string(),
            layouts: vec![level, menu],
            external_layouts: vec![ExternalLayout {
                name: "Level1Decorations".to_string(),
                associated_layout: Some("Level1".to_string()),
                instances: vec![Instance::new("Tree", 300.0, 380.0)],
            }],
            external_events: vec![ExternalEvents {
                name: "CommonEvents".to_string(),
                associated_layout: Some("Level1".to_string()),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_lookup() {
        let project = Project::builtin_sample();
        assert!(project.has_layout("Level1"));
        assert!(project.has_layout("Menu"));
        assert!(!project.has_layout("Level99"));
        assert_eq!(project.layout("Level1").unwrap().instances.len(), 2);
    }

    #[test]
    fn test_external_lookups() {
        let project = Project::builtin_sample();
        assert!(project.has_external_layout("Level1Decorations"));
        assert!(project.has_external_events("CommonEvents"));
        assert!(!project.has_external_events("Nope"));
    }

    #[test]
    fn test_instance_defaults() {
        let instance = Instance::new("Player", 1.0, 2.0);
        assert_eq!(instance.angle, 0.0);
        assert_eq!(instance.z_order, 0);
        assert!(instance.layer.is_empty());
        assert!(!instance.locked);
    }
}
