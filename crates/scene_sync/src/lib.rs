// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene hierarchy synchronization for the scene editor.
//!
//! This crate keeps an editor's hierarchy panel in step with an external
//! scene engine:
//! - Tree derivation from the engine graph, with search and expand state
//! - Engine-owned selection, mirrored and revealed in the tree
//! - A validated command gateway for add, remove, reparent and property edits
//! - Named asset load/save progress multiplexed into UI indicators
//!
//! ## Architecture
//!
//! The engine is reached through the [`SceneGraph`] and [`SceneEditor`]
//! traits and reports back on the [`SceneEvents`] channels. An
//! [`EditorSession`] owns all UI-side state and is pumped once per frame.
//! [`MemoryScene`] is a complete in-memory engine for tests and headless runs.

pub mod asset_tracker;
pub mod commands;
pub mod config;
pub mod engine;
pub mod events;
pub mod history;
pub mod memory;
pub mod selection;
pub mod session;
pub mod snapshot;
pub mod task_queue;
pub mod tree_sync;

pub use asset_tracker::{AssetLoadTracker, Indicator, IndicatorEffect, Phase, ProgressDirection, ProgressEvent, ProgressKind};
pub use commands::{CommandError, CommandGateway, CommandIntent, DispatchOutcome};
pub use config::{ConfigError, SyncConfig};
pub use engine::{
    AttributePath, CommandSource, EditorError, InsertionPolicy, NodeDescriptor, NodeInfo, NodeKind, SceneEditor,
    SceneGraph, SceneNodeRef,
};
pub use events::{EventChannel, SceneEvents, Subscription};
pub use memory::MemoryScene;
pub use selection::SelectionBridge;
pub use session::{EditorSession, PumpReport, UiAction};
pub use snapshot::UiTreeNode;
pub use task_queue::{AssetTask, AssetTaskQueue, TaskError};
pub use tree_sync::{TreeRow, TreeSync};
