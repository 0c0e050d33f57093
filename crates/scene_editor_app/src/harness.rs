// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless editor harness.
//!
//! Runs the hierarchy and status panels inside an egui context without a
//! window, against the in-memory scene. Each [`Harness::frame`] pumps the
//! session, draws the panels and applies both panel and scripted actions.

use crate::panels::{HierarchyPanel, StatusPanel};
use scene_sync::snapshot::SnapshotError;
use scene_sync::task_queue::QueueReport;
use scene_sync::{
    AssetTask, AssetTaskQueue, ConfigError, DispatchOutcome, EditorSession, MemoryScene, SceneNodeRef, SyncConfig,
    UiAction, UiTreeNode,
};
use std::time::Instant;

/// Harness errors
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The scene graph could not be derived
    #[error("Hierarchy error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The async runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// A windowless editor driving the real panels
pub struct Harness {
    ctx: egui::Context,
    scene: MemoryScene,
    session: EditorSession,
    hierarchy: HierarchyPanel,
    status: StatusPanel,
    runtime: tokio::runtime::Runtime,
    max_concurrent_tasks: usize,
    platform_output: egui::PlatformOutput,
    frames: u64,
}

impl Harness {
    /// Create a harness over an empty scene
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let scene = MemoryScene::new();
        let mut session = EditorSession::new(config, scene.events());
        session.refresh(&scene)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("asset-worker")
            .build()?;

        Ok(Self {
            ctx: egui::Context::default(),
            scene,
            session,
            hierarchy: HierarchyPanel::new(),
            status: StatusPanel::new(),
            runtime,
            max_concurrent_tasks: config.assets.max_concurrent_tasks,
            platform_output: egui::PlatformOutput::default(),
            frames: 0,
        })
    }

    /// Run one frame, applying `scripted` after whatever the panels produced
    pub fn frame(&mut self, scripted: Vec<UiAction>, now: Instant) -> Result<Vec<DispatchOutcome>> {
        let report = self.session.pump(&self.scene, now)?;
        if !report.is_idle() {
            tracing::debug!(
                frame = self.frames,
                rederived = report.rederived,
                effects = report.effects.len(),
                "Session pumped"
            );
        }

        let mut actions = Vec::new();
        let ctx = self.ctx.clone();
        let output = ctx.run(egui::RawInput::default(), |ctx| {
            egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
                self.status.ui(ui, self.session.assets());
            });
            egui::CentralPanel::default().show(ctx, |ui| {
                actions = self.hierarchy.ui(ui, &mut self.session);
            });
        });
        // Nothing is painted without a window; keep what a backend would act on
        tracing::trace!(
            frame = self.frames,
            cursor = ?output.platform_output.cursor_icon,
            copied = !output.platform_output.copied_text.is_empty(),
            repaint = output.viewport_output.values().any(|viewport| viewport.repaint_delay.is_zero()),
            "Panels drawn"
        );
        self.platform_output = output.platform_output;
        actions.extend(scripted);

        let mut outcomes = Vec::new();
        for action in actions {
            if let Some(outcome) = self.session.apply(&mut self.scene, action) {
                outcomes.push(outcome);
            }
        }
        self.frames += 1;
        Ok(outcomes)
    }

    /// Run `tasks` to completion on the asset runtime
    pub fn run_assets(&mut self, tasks: Vec<AssetTask>) -> QueueReport {
        let mut queue = AssetTaskQueue::new(self.scene.events(), self.max_concurrent_tasks);
        for task in tasks {
            queue.add_task(task);
        }
        self.runtime.block_on(queue.load())
    }

    /// Key of the first node titled `title`
    pub fn key_of(&self, title: &str) -> Option<SceneNodeRef> {
        find_title(self.session.tree().base_tree(), title)
    }

    /// Titles of the rows on screen, indented by depth
    pub fn outline(&self) -> Vec<String> {
        self.session
            .tree()
            .rows()
            .into_iter()
            .map(|row| format!("{}{}", "  ".repeat(row.depth), row.title))
            .collect()
    }

    /// Editor session
    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    /// Scene being edited
    pub fn scene(&self) -> &MemoryScene {
        &self.scene
    }

    /// What the last frame asked of the platform
    pub fn platform_output(&self) -> &egui::PlatformOutput {
        &self.platform_output
    }

    /// Frames run so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

fn find_title(nodes: &[UiTreeNode], title: &str) -> Option<SceneNodeRef> {
    let mut stack: Vec<&UiTreeNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.title == title {
            return Some(node.key);
        }
        stack.extend(node.children.iter().rev());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_sync::engine::{LightKind, Primitive};
    use scene_sync::{NodeDescriptor, Phase, ProgressDirection, TaskError};

    #[test]
    fn test_scripted_frames_edit_the_scene() {
        let mut harness = Harness::new(&SyncConfig::default()).unwrap();
        let now = Instant::now();

        harness
            .frame(
                vec![
                    UiAction::Add(NodeDescriptor::container().named("Environment")),
                    UiAction::Add(NodeDescriptor::mesh(Primitive::Ground)),
                    UiAction::Add(NodeDescriptor::light(LightKind::Hemispheric)),
                ],
                now,
            )
            .unwrap();
        harness.frame(Vec::new(), now).unwrap();
        assert_eq!(harness.outline(), ["Environment", "Ground", "Hemispheric Light"]);

        let env = harness.key_of("Environment").unwrap();
        let ground = harness.key_of("Ground").unwrap();
        let outcomes = harness
            .frame(vec![UiAction::Drop { dragged: ground, target: env }, UiAction::Click(ground)], now)
            .unwrap();
        assert!(outcomes.iter().all(DispatchOutcome::is_issued));
        harness.frame(Vec::new(), now).unwrap();
        assert_eq!(harness.outline(), ["Environment", "  Ground", "Hemispheric Light"]);
        assert!(harness.session().selection().is_selected(ground));
        assert_eq!(harness.frames(), 4);
    }

    #[test]
    fn test_frame_keeps_platform_output() {
        let mut harness = Harness::new(&SyncConfig::default()).unwrap();
        harness.frame(vec![UiAction::Add(NodeDescriptor::camera())], Instant::now()).unwrap();
        harness.frame(Vec::new(), Instant::now()).unwrap();

        let output = harness.platform_output();
        assert_eq!(output.cursor_icon, egui::CursorIcon::Default);
        assert!(output.copied_text.is_empty());
        assert!(output.open_url.is_none());
    }

    #[test]
    fn test_assets_report_through_status() {
        let mut harness = Harness::new(&SyncConfig::default()).unwrap();
        let tasks = vec![
            AssetTask::new(ProgressDirection::Load, "ground.png", |reporter| async move {
                for loaded in (0..=64).step_by(16) {
                    reporter.report(loaded, 64);
                    tokio::task::yield_now().await;
                }
                Ok(())
            }),
            AssetTask::new(ProgressDirection::Save, "level.scene", |_| async move {
                Err(TaskError::Other("read-only volume".to_string()))
            }),
        ];
        let report = harness.run_assets(tasks);
        assert_eq!(report.succeeded, vec!["ground.png".to_string()]);

        harness.frame(Vec::new(), Instant::now()).unwrap();
        let phases: Vec<Phase> = harness.session().assets().indicators().map(|i| i.phase).collect();
        assert_eq!(phases.len(), 2);
        assert!(phases.contains(&Phase::Done));
        assert!(phases.contains(&Phase::Failed));
        assert!(harness.scene().is_empty());
    }
}
