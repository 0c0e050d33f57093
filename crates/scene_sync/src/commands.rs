// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command gateway.
//!
//! Turns UI intents into calls on the engine's command execution layer.
//! Every node an intent names is resolved against the live engine graph
//! first, so a destructive command is never issued for a node that is
//! already gone. The gateway does not touch UI state; the resulting engine
//! change notification drives the hierarchy.

use crate::config::GatewayConfig;
use crate::engine::{
    AttributePath, CommandSource, EditorError, InsertionPolicy, NodeDescriptor, SceneEditor,
    SceneGraph, SceneNodeRef,
};

/// A UI intent, consumed exactly once by the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum CommandIntent {
    /// Create a node
    Add {
        /// What to create
        descriptor: NodeDescriptor,
        /// Origin tag
        source: CommandSource,
    },
    /// Destroy a node
    Remove {
        /// Node to destroy
        node: SceneNodeRef,
        /// Origin tag
        source: CommandSource,
    },
    /// Move a node under a new parent
    Reparent {
        /// Dragged node
        child: SceneNodeRef,
        /// Drop target
        new_parent: SceneNodeRef,
        /// Placement under the target
        policy: InsertionPolicy,
    },
    /// Set a possibly nested attribute
    SetProperty {
        /// Target node
        node: SceneNodeRef,
        /// Attribute address
        path: AttributePath,
        /// New value
        value: serde_json::Value,
    },
    /// Show or hide a node
    SetVisibility {
        /// Target node
        node: SceneNodeRef,
        /// New visibility
        visible: bool,
    },
}

impl CommandIntent {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Reparent { .. } => "reparent",
            Self::SetProperty { .. } => "set-property",
            Self::SetVisibility { .. } => "set-visibility",
        }
    }
}

/// Error type for command dispatch
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The node no longer exists in the engine graph
    #[error("Stale reference: {0}")]
    StaleReference(SceneNodeRef),

    /// The drop would place a node inside itself
    #[error("Cannot move {dragged} under {target}")]
    InvalidReparent {
        /// Dragged node
        dragged: SceneNodeRef,
        /// Drop target
        target: SceneNodeRef,
    },

    /// The intent is malformed
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The engine refused or failed the command
    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),
}

/// What happened to a dispatched intent
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The external command was issued
    Issued,
    /// A referenced node was gone; nothing was issued
    Stale(SceneNodeRef),
    /// Rejected locally before reaching the engine
    Rejected(CommandError),
    /// The engine call failed
    Failed(EditorError),
}

impl DispatchOutcome {
    /// Whether the external command went out
    pub fn is_issued(&self) -> bool {
        matches!(self, Self::Issued)
    }
}

/// Validated facade over the engine's command API
#[derive(Debug, Clone, Default)]
pub struct CommandGateway {
    config: GatewayConfig,
}

impl CommandGateway {
    /// Create a gateway
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Gateway settings
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Dispatch an intent, logging and absorbing every failure
    pub fn dispatch<E>(&self, editor: &mut E, intent: CommandIntent) -> DispatchOutcome
    where
        E: SceneEditor + ?Sized,
    {
        let label = intent.label();
        match self.try_dispatch(editor, intent) {
            Ok(()) => {
                tracing::debug!("Issued {label} command");
                DispatchOutcome::Issued
            }
            Err(CommandError::StaleReference(node)) => {
                tracing::debug!("Dropped {label} command for stale node {node}");
                DispatchOutcome::Stale(node)
            }
            Err(CommandError::Editor(err)) => {
                tracing::warn!("Editor failed {label} command: {err}");
                DispatchOutcome::Failed(err)
            }
            Err(err) => {
                tracing::warn!("Rejected {label} command: {err}");
                DispatchOutcome::Rejected(err)
            }
        }
    }

    /// Dispatch an intent, returning the typed failure
    pub fn try_dispatch<E>(&self, editor: &mut E, intent: CommandIntent) -> Result<(), CommandError>
    where
        E: SceneEditor + ?Sized,
    {
        match intent {
            CommandIntent::Add { descriptor, source } => {
                editor.add_object(source, descriptor)?;
            }
            CommandIntent::Remove { node, source } => {
                ensure_exists(editor, node)?;
                editor.remove_object(source, node)?;
            }
            CommandIntent::Reparent {
                child,
                new_parent,
                policy,
            } => {
                ensure_exists(editor, child)?;
                ensure_exists(editor, new_parent)?;
                if child == new_parent || is_descendant(editor, child, new_parent) {
                    return Err(CommandError::InvalidReparent {
                        dragged: child,
                        target: new_parent,
                    });
                }
                editor.move_object(child, new_parent, policy)?;
            }
            CommandIntent::SetProperty { node, path, value } => {
                if path.is_empty() {
                    return Err(CommandError::InvalidOperation(
                        "Empty attribute path".to_string(),
                    ));
                }
                ensure_exists(editor, node)?;
                editor.set_value(node, &path, value)?;
            }
            CommandIntent::SetVisibility { node, visible } => {
                ensure_exists(editor, node)?;
                editor.set_value(node, &AttributePath::visibility(), serde_json::Value::Bool(visible))?;
            }
        }
        Ok(())
    }

    /// Add a node from the editor UI
    pub fn add<E>(&self, editor: &mut E, descriptor: NodeDescriptor) -> DispatchOutcome
    where
        E: SceneEditor + ?Sized,
    {
        self.dispatch(
            editor,
            CommandIntent::Add {
                descriptor,
                source: self.config.source,
            },
        )
    }

    /// Remove a node from the editor UI
    pub fn remove<E>(&self, editor: &mut E, node: SceneNodeRef) -> DispatchOutcome
    where
        E: SceneEditor + ?Sized,
    {
        self.dispatch(
            editor,
            CommandIntent::Remove {
                node,
                source: self.config.source,
            },
        )
    }

    /// Handle a hierarchy drop of `dragged` onto `target`
    pub fn drop_onto<E>(&self, editor: &mut E, dragged: SceneNodeRef, target: SceneNodeRef) -> DispatchOutcome
    where
        E: SceneEditor + ?Sized,
    {
        self.dispatch(
            editor,
            CommandIntent::Reparent {
                child: dragged,
                new_parent: target,
                policy: self.config.reparent_policy,
            },
        )
    }

    /// Rename a node
    pub fn rename<E>(&self, editor: &mut E, node: SceneNodeRef, name: impl Into<String>) -> DispatchOutcome
    where
        E: SceneEditor + ?Sized,
    {
        self.dispatch(
            editor,
            CommandIntent::SetProperty {
                node,
                path: AttributePath::name(),
                value: serde_json::Value::String(name.into()),
            },
        )
    }

    /// Flip a node's visibility through the engine
    pub fn toggle_visibility<E>(&self, editor: &mut E, node: SceneNodeRef) -> DispatchOutcome
    where
        E: SceneEditor + ?Sized,
    {
        if !editor.contains(node) {
            tracing::debug!("Dropped visibility toggle for stale node {node}");
            return DispatchOutcome::Stale(node);
        }
        match editor.toggle_visibility(node) {
            Ok(()) => DispatchOutcome::Issued,
            Err(err) => {
                tracing::warn!("Editor failed visibility toggle: {err}");
                DispatchOutcome::Failed(err)
            }
        }
    }

    /// Pass-through for the undo shortcut
    pub fn undo<E>(&self, editor: &mut E) -> DispatchOutcome
    where
        E: SceneEditor + ?Sized,
    {
        match editor.undo() {
            Ok(()) => DispatchOutcome::Issued,
            Err(err) => {
                tracing::debug!("Undo: {err}");
                DispatchOutcome::Failed(err)
            }
        }
    }

    /// Pass-through for the redo shortcut
    pub fn redo<E>(&self, editor: &mut E) -> DispatchOutcome
    where
        E: SceneEditor + ?Sized,
    {
        match editor.redo() {
            Ok(()) => DispatchOutcome::Issued,
            Err(err) => {
                tracing::debug!("Redo: {err}");
                DispatchOutcome::Failed(err)
            }
        }
    }
}

fn ensure_exists<G>(graph: &G, node: SceneNodeRef) -> Result<(), CommandError>
where
    G: SceneGraph + ?Sized,
{
    if graph.contains(node) {
        Ok(())
    } else {
        Err(CommandError::StaleReference(node))
    }
}

/// Whether `candidate` lies in the subtree below `ancestor` in the live graph
fn is_descendant<G>(graph: &G, ancestor: SceneNodeRef, candidate: SceneNodeRef) -> bool
where
    G: SceneGraph + ?Sized,
{
    let mut stack = match graph.resolve(ancestor) {
        Some(info) => info.children,
        None => return false,
    };
    let mut seen = std::collections::HashSet::new();
    while let Some(node) = stack.pop() {
        if node == candidate {
            return true;
        }
        if !seen.insert(node) {
            continue;
        }
        if let Some(info) = graph.resolve(node) {
            stack.extend(info.children);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NodeKind, Primitive};
    use crate::memory::{EditorCall, MemoryScene};

    fn scene() -> (MemoryScene, SceneNodeRef, SceneNodeRef, SceneNodeRef, SceneNodeRef) {
        let mut scene = MemoryScene::new();
        let root = scene.insert("Root", NodeKind::Container, None);
        let a = scene.insert("A", NodeKind::Mesh, Some(root));
        let b = scene.insert("B", NodeKind::Container, Some(root));
        let c = scene.insert("C", NodeKind::Mesh, Some(b));
        (scene, root, a, b, c)
    }

    #[test]
    fn test_drop_issues_single_move() {
        let (mut scene, _, a, b, _) = scene();
        let gateway = CommandGateway::default();

        assert!(gateway.drop_onto(&mut scene, a, b).is_issued());
        assert_eq!(
            scene.calls(),
            [EditorCall::MoveObject {
                dragged: a,
                target: b,
                policy: InsertionPolicy::AppendLast,
            }]
        );
        assert_eq!(scene.resolve(b).unwrap().children.last(), Some(&a));
    }

    #[test]
    fn test_stale_reference_issues_nothing() {
        let (mut scene, _, a, b, _) = scene();
        let gateway = CommandGateway::default();
        let ghost = SceneNodeRef::new();

        let intents = [
            CommandIntent::Remove {
                node: ghost,
                source: CommandSource::Editor,
            },
            CommandIntent::Reparent {
                child: ghost,
                new_parent: b,
                policy: InsertionPolicy::AppendLast,
            },
            CommandIntent::Reparent {
                child: a,
                new_parent: ghost,
                policy: InsertionPolicy::AppendLast,
            },
            CommandIntent::SetProperty {
                node: ghost,
                path: AttributePath::new(["position", "x"]),
                value: serde_json::json!(1.0),
            },
            CommandIntent::SetVisibility {
                node: ghost,
                visible: false,
            },
        ];

        for intent in intents {
            assert_eq!(gateway.dispatch(&mut scene, intent), DispatchOutcome::Stale(ghost));
        }
        assert_eq!(gateway.toggle_visibility(&mut scene, ghost), DispatchOutcome::Stale(ghost));
        assert!(scene.calls().is_empty());
    }

    #[test]
    fn test_add_tags_editor_source() {
        let (mut scene, ..) = scene();
        let gateway = CommandGateway::default();
        let descriptor = NodeDescriptor::mesh(Primitive::Torus);

        assert!(gateway.add(&mut scene, descriptor.clone()).is_issued());
        assert_eq!(
            scene.calls(),
            [EditorCall::AddObject {
                source: CommandSource::Editor,
                descriptor,
            }]
        );
    }

    #[test]
    fn test_remove_resolves_then_removes() {
        let (mut scene, _, _, b, c) = scene();
        let gateway = CommandGateway::default();

        assert!(gateway.remove(&mut scene, b).is_issued());
        assert!(!scene.contains(b));
        assert!(!scene.contains(c));
        // Second attempt races with the removal
        assert_eq!(gateway.remove(&mut scene, b), DispatchOutcome::Stale(b));
        assert_eq!(scene.calls().len(), 1);
    }

    #[test]
    fn test_drop_into_own_subtree_is_rejected() {
        let (mut scene, root, _, b, c) = scene();
        let gateway = CommandGateway::default();

        assert!(matches!(
            gateway.drop_onto(&mut scene, b, c),
            DispatchOutcome::Rejected(CommandError::InvalidReparent { .. })
        ));
        assert!(matches!(
            gateway.drop_onto(&mut scene, root, root),
            DispatchOutcome::Rejected(CommandError::InvalidReparent { .. })
        ));
        assert!(scene.calls().is_empty());
    }

    #[test]
    fn test_visibility_uses_attribute_path() {
        let (mut scene, _, a, ..) = scene();
        let gateway = CommandGateway::default();

        let intent = CommandIntent::SetVisibility { node: a, visible: false };
        assert!(gateway.dispatch(&mut scene, intent).is_issued());
        assert_eq!(
            scene.calls(),
            [EditorCall::SetValue {
                node: a,
                path: AttributePath::visibility(),
                value: serde_json::Value::Bool(false),
            }]
        );
        assert!(!scene.resolve(a).unwrap().visible);

        assert!(gateway.toggle_visibility(&mut scene, a).is_issued());
        assert!(scene.resolve(a).unwrap().visible);
    }

    #[test]
    fn test_rename_and_nested_property() {
        let (mut scene, _, a, ..) = scene();
        let gateway = CommandGateway::default();

        assert!(gateway.rename(&mut scene, a, "Hero").is_issued());
        assert_eq!(scene.resolve(a).unwrap().name, "Hero");

        let intent = CommandIntent::SetProperty {
            node: a,
            path: AttributePath::new(["position", "y"]),
            value: serde_json::json!(2.5),
        };
        assert!(gateway.dispatch(&mut scene, intent).is_issued());
        assert_eq!(scene.attribute(a, &AttributePath::new(["position", "y"])), Some(serde_json::json!(2.5)));
    }

    #[test]
    fn test_engine_failure_is_absorbed() {
        let (mut scene, _, a, ..) = scene();
        let gateway = CommandGateway::default();
        let intent = CommandIntent::SetProperty {
            node: a,
            path: AttributePath::name(),
            value: serde_json::json!(42),
        };
        assert!(matches!(
            gateway.dispatch(&mut scene, intent),
            DispatchOutcome::Failed(EditorError::InvalidValue { .. })
        ));
        assert!(matches!(gateway.undo(&mut MemoryScene::new()), DispatchOutcome::Failed(EditorError::NothingToUndo)));
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let (mut scene, _, a, ..) = scene();
        let gateway = CommandGateway::default();
        let intent = CommandIntent::SetProperty {
            node: a,
            path: AttributePath::new(Vec::<String>::new()),
            value: serde_json::Value::Null,
        };
        assert!(matches!(
            gateway.try_dispatch(&mut scene, intent),
            Err(CommandError::InvalidOperation(_))
        ));
        assert!(scene.calls().is_empty());
    }
}
