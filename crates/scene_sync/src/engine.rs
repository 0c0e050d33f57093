// SPDX-License-Identifier: MIT OR Apache-2.0
//! Capability contract of the scene/editor collaborator.
//!
//! The rendering engine owns the live scene graph. This crate only reads it
//! through [`SceneGraph`] and asks for mutations through [`SceneEditor`];
//! results come back later as notifications on [`SceneEvents`](crate::events::SceneEvents).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identity of an engine node, stable for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneNodeRef(pub Uuid);

impl SceneNodeRef {
    /// Create a new random node reference
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SceneNodeRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SceneNodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of an engine node, reported once by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Renderable geometry
    Mesh,
    /// Light source
    Light,
    /// Camera
    Camera,
    /// Pure organizational/transform node without geometry
    Container,
}

impl NodeKind {
    /// Whether the hierarchy offers a visibility toggle for this kind
    pub fn shows_visibility_toggle(self) -> bool {
        !matches!(self, Self::Container)
    }
}

/// What the engine reports about a node when it is resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Display name
    pub name: String,
    /// Node classification
    pub kind: NodeKind,
    /// Current visibility
    pub visible: bool,
    /// Children in authoring order
    pub children: Vec<SceneNodeRef>,
}

/// Origin tag attached to add/remove commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandSource {
    /// Issued from the editor UI
    #[default]
    Editor,
    /// Issued by scripts or engine-internal logic
    Programmatic,
}

impl CommandSource {
    /// Tag string understood by the execution layer
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Programmatic => "programmatic",
        }
    }
}

/// Where a moved node lands under its new parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InsertionPolicy {
    /// Append as the last child of the target
    #[default]
    AppendLast,
    /// Insert as the first child of the target
    Prepend,
}

/// Dotted attribute address, e.g. `["position", "x"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributePath(Vec<String>);

impl AttributePath {
    /// Build a path from its segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Path of the visibility flag
    pub fn visibility() -> Self {
        Self::new(["isVisible"])
    }

    /// Path of the display name
    pub fn name() -> Self {
        Self::new(["name"])
    }

    /// Path segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether the path has no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Primitive mesh shapes offered by the "add" menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    /// Cube
    Box,
    /// UV sphere
    Sphere,
    /// Cylinder
    Cylinder,
    /// Flat plane
    Plane,
    /// Ground plane
    Ground,
    /// Torus
    Torus,
}

impl Primitive {
    /// Display name of a freshly added primitive
    pub fn label(self) -> &'static str {
        match self {
            Self::Box => "Box",
            Self::Sphere => "Sphere",
            Self::Cylinder => "Cylinder",
            Self::Plane => "Plane",
            Self::Ground => "Ground",
            Self::Torus => "Torus",
        }
    }

    /// Construction parameters forwarded to the engine unchanged
    pub fn parameters(self) -> IndexMap<String, f64> {
        let pairs: &[(&str, f64)] = match self {
            Self::Box => &[("size", 1.0)],
            Self::Sphere => &[("diameter", 1.0), ("segments", 32.0)],
            Self::Cylinder => &[("height", 2.0), ("diameter", 1.0), ("tessellation", 24.0)],
            Self::Plane => &[("size", 1.0)],
            Self::Ground => &[("width", 6.0), ("height", 6.0), ("subdivisions", 2.0)],
            Self::Torus => &[("diameter", 1.0), ("thickness", 0.5), ("tessellation", 16.0)],
        };
        to_parameters(pairs)
    }
}

/// Light types offered by the "add" menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightKind {
    /// Omnidirectional point light
    Point,
    /// Directional light
    Directional,
    /// Spot light
    Spot,
    /// Hemispheric ambient light
    Hemispheric,
}

impl LightKind {
    /// Display name of a freshly added light
    pub fn label(self) -> &'static str {
        match self {
            Self::Point => "Point Light",
            Self::Directional => "Directional Light",
            Self::Spot => "Spot Light",
            Self::Hemispheric => "Hemispheric Light",
        }
    }

    /// Construction parameters forwarded to the engine unchanged
    pub fn parameters(self) -> IndexMap<String, f64> {
        let pairs: &[(&str, f64)] = match self {
            Self::Point => &[("intensity", 1.0), ("y", 1.0)],
            Self::Directional => &[("intensity", 1.0), ("dir_x", 0.0), ("dir_y", -1.0), ("dir_z", 0.0)],
            Self::Spot => &[("intensity", 1.0), ("angle", std::f64::consts::FRAC_PI_3), ("exponent", 2.0)],
            Self::Hemispheric => &[("intensity", 0.7), ("dir_x", 0.0), ("dir_y", 1.0), ("dir_z", 0.0)],
        };
        to_parameters(pairs)
    }
}

fn to_parameters(pairs: &[(&str, f64)]) -> IndexMap<String, f64> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

/// Template of what an add command should construct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectTemplate {
    /// Primitive mesh
    Mesh(Primitive),
    /// Light
    Light(LightKind),
    /// Free camera
    Camera,
    /// Empty transform node
    Container,
}

/// Descriptor of a node to be created by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Initial display name
    pub name: String,
    /// What to construct
    pub template: ObjectTemplate,
    /// Construction parameters
    pub parameters: IndexMap<String, f64>,
}

impl NodeDescriptor {
    /// Descriptor for a primitive mesh with its constant parameters
    pub fn mesh(shape: Primitive) -> Self {
        Self {
            name: shape.label().to_string(),
            template: ObjectTemplate::Mesh(shape),
            parameters: shape.parameters(),
        }
    }

    /// Descriptor for a light with its constant parameters
    pub fn light(light: LightKind) -> Self {
        Self {
            name: light.label().to_string(),
            template: ObjectTemplate::Light(light),
            parameters: light.parameters(),
        }
    }

    /// Descriptor for a free camera
    pub fn camera() -> Self {
        Self {
            name: "Camera".to_string(),
            template: ObjectTemplate::Camera,
            parameters: to_parameters(&[("z", -10.0)]),
        }
    }

    /// Descriptor for an empty container node
    pub fn container() -> Self {
        Self {
            name: "Transform Node".to_string(),
            template: ObjectTemplate::Container,
            parameters: IndexMap::new(),
        }
    }

    /// Override the display name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Classification the engine will report for the created node
    pub fn kind(&self) -> NodeKind {
        match self.template {
            ObjectTemplate::Mesh(_) => NodeKind::Mesh,
            ObjectTemplate::Light(_) => NodeKind::Light,
            ObjectTemplate::Camera => NodeKind::Camera,
            ObjectTemplate::Container => NodeKind::Container,
        }
    }
}

/// Failures reported by the collaborator
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    /// The node does not exist in the scene
    #[error("Node not found: {0}")]
    NodeNotFound(SceneNodeRef),

    /// The attribute path is not understood by the engine
    #[error("Unsupported attribute path: {0}")]
    UnsupportedAttribute(AttributePath),

    /// The value has the wrong shape for the attribute
    #[error("Invalid value for {path}: {reason}")]
    InvalidValue {
        /// Target attribute
        path: AttributePath,
        /// Why the value was refused
        reason: String,
    },

    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// The engine refused the command for another reason
    #[error("Command rejected: {0}")]
    Rejected(String),
}

/// Read access to the live scene graph
pub trait SceneGraph {
    /// Root nodes in authoring order
    fn roots(&self) -> Vec<SceneNodeRef>;

    /// Look up a node, `None` once the engine has destroyed or detached it
    fn resolve(&self, node: SceneNodeRef) -> Option<NodeInfo>;

    /// Whether the node currently exists
    fn contains(&self, node: SceneNodeRef) -> bool {
        self.resolve(node).is_some()
    }
}

/// Mutating calls into the engine's command execution layer.
///
/// Every call is fire-and-forget from the caller's point of view: its
/// effect becomes visible through the change notifications.
pub trait SceneEditor: SceneGraph {
    /// Make `node` the single active selection, or clear it
    fn select(&mut self, node: Option<SceneNodeRef>) -> Result<(), EditorError>;

    /// Create a new node from a descriptor
    fn add_object(&mut self, source: CommandSource, object: NodeDescriptor) -> Result<(), EditorError>;

    /// Destroy a node and its subtree
    fn remove_object(&mut self, source: CommandSource, node: SceneNodeRef) -> Result<(), EditorError>;

    /// Reparent `dragged` under `target`
    fn move_object(
        &mut self,
        dragged: SceneNodeRef,
        target: SceneNodeRef,
        policy: InsertionPolicy,
    ) -> Result<(), EditorError>;

    /// Set a possibly nested attribute
    fn set_value(
        &mut self,
        node: SceneNodeRef,
        path: &AttributePath,
        value: serde_json::Value,
    ) -> Result<(), EditorError>;

    /// Flip the visibility flag of a node
    fn toggle_visibility(&mut self, node: SceneNodeRef) -> Result<(), EditorError> {
        let info = self.resolve(node).ok_or(EditorError::NodeNotFound(node))?;
        self.set_value(node, &AttributePath::visibility(), serde_json::Value::Bool(!info.visible))
    }

    /// Undo the last command
    fn undo(&mut self) -> Result<(), EditorError>;

    /// Redo the last undone command
    fn redo(&mut self) -> Result<(), EditorError>;
}
