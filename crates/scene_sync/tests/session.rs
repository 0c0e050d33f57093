// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end editing sessions against the in-memory scene.

use futures::executor::block_on;
use scene_sync::asset_tracker::IndicatorKey;
use scene_sync::events::SelectionChanged;
use scene_sync::memory::EditorCall;
use scene_sync::task_queue::ProgressReporter;
use scene_sync::{
    AssetTask, AssetTaskQueue, DispatchOutcome, EditorSession, IndicatorEffect, InsertionPolicy, MemoryScene,
    NodeDescriptor, NodeKind, Phase, ProgressDirection, SceneGraph, SceneNodeRef, SyncConfig, TaskError, UiAction,
    UiTreeNode,
};
use scene_sync::engine::{LightKind, Primitive};
use std::time::{Duration, Instant};

struct Editor {
    scene: MemoryScene,
    session: EditorSession,
}

impl Editor {
    fn new(config: SyncConfig) -> Self {
        let scene = MemoryScene::new();
        let mut session = EditorSession::new(&config, scene.events());
        session.refresh(&scene).unwrap();
        Self { scene, session }
    }

    fn act(&mut self, action: UiAction) -> Option<DispatchOutcome> {
        self.session.apply(&mut self.scene, action)
    }

    fn frame(&mut self, now: Instant) {
        self.session.pump(&self.scene, now).unwrap();
    }

    fn titles(&self) -> Vec<String> {
        self.session.tree().rows().into_iter().map(|r| r.title).collect()
    }

    fn key_of(&self, title: &str) -> SceneNodeRef {
        fn find(nodes: &[UiTreeNode], title: &str) -> Option<SceneNodeRef> {
            nodes
                .iter()
                .find_map(|n| if n.title == title { Some(n.key) } else { find(&n.children, title) })
        }
        find(self.session.tree().base_tree(), title).unwrap()
    }
}

#[test]
fn build_and_rearrange_a_scene() {
    let mut editor = Editor::new(SyncConfig::default());
    let now = Instant::now();

    editor.act(UiAction::Add(NodeDescriptor::container().named("Props")));
    editor.act(UiAction::Add(NodeDescriptor::mesh(Primitive::Box)));
    editor.act(UiAction::Add(NodeDescriptor::light(LightKind::Spot)));
    editor.frame(now);
    assert_eq!(editor.titles(), ["Props", "Box", "Spot Light"]);
    // The last add holds the selection
    assert_eq!(editor.session.selection().selected_keys(), vec![editor.key_of("Spot Light")]);

    let props = editor.key_of("Props");
    let cube = editor.key_of("Box");
    assert!(editor.act(UiAction::Drop { dragged: cube, target: props }).unwrap().is_issued());
    editor.frame(now);
    // Props is collapsed, its new child stays hidden
    assert_eq!(editor.titles(), ["Props", "Spot Light"]);

    editor.act(UiAction::Click(cube));
    editor.frame(now);
    assert_eq!(editor.titles(), ["Props", "Box", "Spot Light"]);
    assert_eq!(editor.session.tree_mut().take_scroll_target(), Some(cube));

    editor.act(UiAction::Rename { node: cube, name: "Crate".to_string() });
    editor.frame(now);
    assert_eq!(editor.titles(), ["Props", "Crate", "Spot Light"]);

    editor.act(UiAction::Undo);
    editor.frame(now);
    assert_eq!(editor.titles(), ["Props", "Box", "Spot Light"]);
    editor.act(UiAction::Redo);
    editor.frame(now);
    assert_eq!(editor.titles(), ["Props", "Crate", "Spot Light"]);
}

#[test]
fn drag_issues_exactly_one_move() {
    let mut editor = Editor::new(SyncConfig::default());
    let root = editor.scene.insert("Root", NodeKind::Container, None);
    let a = editor.scene.insert("A", NodeKind::Mesh, Some(root));
    let b = editor.scene.insert("B", NodeKind::Container, Some(root));
    editor.scene.insert("C", NodeKind::Mesh, Some(b));
    editor.frame(Instant::now());

    editor.act(UiAction::Drop { dragged: a, target: b });
    assert_eq!(
        editor.scene.calls(),
        [EditorCall::MoveObject {
            dragged: a,
            target: b,
            policy: InsertionPolicy::AppendLast,
        }]
    );
}

#[test]
fn stale_rows_never_reach_the_engine() {
    let mut editor = Editor::new(SyncConfig::default());
    let root = editor.scene.insert("Root", NodeKind::Container, None);
    let gone = editor.scene.insert("Gone", NodeKind::Mesh, Some(root));
    editor.frame(Instant::now());

    // The engine drops the node before the UI sees the change
    editor.scene.detach(gone);
    let actions = [
        UiAction::Click(gone),
        UiAction::ToggleVisibility(gone),
        UiAction::Delete(gone),
        UiAction::Drop { dragged: gone, target: root },
        UiAction::Drop { dragged: root, target: gone },
        UiAction::Rename { node: gone, name: "x".to_string() },
    ];
    for action in actions {
        assert_eq!(editor.act(action), Some(DispatchOutcome::Stale(gone)));
    }
    editor.act(UiAction::ToggleExpand(gone));
    assert!(editor.scene.calls().is_empty());

    editor.frame(Instant::now());
    assert_eq!(editor.titles(), ["Root"]);
}

#[test]
fn selection_stays_single_valued_under_interleaving() {
    let mut editor = Editor::new(SyncConfig::default());
    let a = editor.scene.insert("A", NodeKind::Mesh, None);
    let b = editor.scene.insert("B", NodeKind::Mesh, None);
    editor.frame(Instant::now());

    editor.act(UiAction::Click(a));
    editor.act(UiAction::Click(b));
    editor.scene.events().object_selected.publish(SelectionChanged { node: None });
    editor.act(UiAction::Click(a));

    let mut snapshots = Vec::new();
    for _ in 0..2 {
        editor.frame(Instant::now());
        snapshots.push(editor.session.selection().selected_keys());
    }
    assert!(snapshots.iter().all(|keys| keys.len() <= 1));
    assert_eq!(editor.session.selection().selected(), Some(a));
    // Confirmations never turn into new select calls
    assert_eq!(editor.scene.calls().len(), 3);
}

#[test]
fn search_keeps_matching_paths() {
    let mut editor = Editor::new(SyncConfig::default());
    let level = editor.scene.insert("Level", NodeKind::Container, None);
    let lights = editor.scene.insert("Lights", NodeKind::Container, Some(level));
    editor.scene.insert("Sun", NodeKind::Light, Some(lights));
    editor.scene.insert("Fill Lamp", NodeKind::Light, Some(lights));
    let geometry = editor.scene.insert("Geometry", NodeKind::Container, Some(level));
    editor.scene.insert("Lamp Post", NodeKind::Mesh, Some(geometry));
    editor.scene.insert("Bench", NodeKind::Mesh, Some(geometry));
    editor.frame(Instant::now());

    editor.act(UiAction::Search("Lamp".to_string()));
    assert_eq!(
        editor.titles(),
        ["Level", "Lights", "Fill Lamp", "Geometry", "Lamp Post"]
    );
    // Case-sensitive
    editor.act(UiAction::Search("lamp".to_string()));
    assert!(editor.titles().is_empty());

    // The filtered view follows engine changes
    editor.act(UiAction::Search("Bench".to_string()));
    editor.scene.insert("Bench 2", NodeKind::Mesh, Some(lights));
    editor.frame(Instant::now());
    assert_eq!(editor.titles(), ["Level", "Lights", "Bench 2", "Geometry", "Bench"]);
}

#[test]
fn visibility_toggle_round_trips() {
    let mut editor = Editor::new(SyncConfig::default());
    let mesh = editor.scene.insert("Mesh", NodeKind::Mesh, None);
    let group = editor.scene.insert("Group", NodeKind::Container, None);
    editor.frame(Instant::now());

    let rows = editor.session.tree().rows();
    assert!(rows[0].show_visibility_toggle);
    assert!(!rows[1].show_visibility_toggle);

    editor.act(UiAction::ToggleVisibility(mesh));
    // No optimistic update
    assert!(editor.session.tree().rows()[0].visible);
    editor.frame(Instant::now());
    assert!(!editor.session.tree().rows()[0].visible);
    assert!(editor.scene.resolve(group).unwrap().visible);
}

#[test]
fn queued_assets_drive_indicators() {
    let mut editor = Editor::new(SyncConfig::default());
    let mut queue = AssetTaskQueue::new(editor.scene.events(), 2);

    queue.add_task(AssetTask::new(
        ProgressDirection::Load,
        "terrain.glb",
        |reporter: ProgressReporter| async move {
            reporter.report(0, 100);
            reporter.report(40, 100);
            reporter.report(100, 100);
            Ok(())
        },
    ));
    queue.add_task(AssetTask::new(
        ProgressDirection::Save,
        "level.scene",
        |reporter: ProgressReporter| async move {
            reporter.report(10, 50);
            Err(TaskError::Transfer("disk full".to_string()))
        },
    ));

    let report = block_on(queue.load());
    assert_eq!(report.succeeded, vec!["terrain.glb".to_string()]);
    assert_eq!(report.failed.len(), 1);

    let start = Instant::now();
    let frame = editor.session.pump(&editor.scene, start).unwrap();
    assert!(frame
        .effects
        .iter()
        .any(|e| matches!(e, IndicatorEffect::Succeed { key } if key.name == "terrain.glb")));
    assert!(frame
        .effects
        .iter()
        .any(|e| matches!(e, IndicatorEffect::Fail { key, .. } if key.name == "level.scene")));

    let assets = editor.session.assets();
    assert!(assets.loads().is_empty());
    assert!(assets.saves().is_empty());
    let failed = assets
        .indicator(&IndicatorKey::new(ProgressDirection::Save, "level.scene"))
        .unwrap();
    assert_eq!(failed.phase, Phase::Failed);

    editor.frame(start + Duration::from_secs(10));
    assert_eq!(editor.session.assets().indicators().count(), 0);
}

#[test]
fn stall_timeout_fails_silent_operations() {
    let config = SyncConfig::from_ron("(assets: (stall_timeout_ms: Some(1000)))").unwrap();
    let mut editor = Editor::new(config);
    let start = Instant::now();

    editor
        .scene
        .events()
        .load_progress
        .publish(scene_sync::ProgressEvent::progressing(ProgressDirection::Load, "sky.hdr", 3, 10));
    editor.frame(start);
    assert_eq!(editor.session.assets().loads().len(), 1);

    let frame = editor.session.pump(&editor.scene, start + Duration::from_millis(1500)).unwrap();
    assert!(frame.effects.iter().any(|e| matches!(e, IndicatorEffect::Fail { .. })));
    assert!(editor.session.assets().loads().is_empty());
}
