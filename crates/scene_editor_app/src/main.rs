// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene Editor - hierarchy and asset status for an external scene engine
//!
//! Runs a scripted editing session headlessly:
//! - Hierarchy panel mirroring the scene graph, with search and drag-drop
//! - Status bar with per-asset load/save indicators
//! - Undo/redo through the engine's command layer
//!
//! ## Usage
//!
//! `scene_editor [config.ron]` - the optional argument is a RON `SyncConfig`.
//! Logging is controlled through `RUST_LOG`.

mod harness;
mod panels;

use harness::{Harness, HarnessError};
use scene_sync::engine::{LightKind, Primitive};
use scene_sync::{AssetTask, NodeDescriptor, ProgressDirection, SyncConfig, UiAction};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scene_sync=debug,scene_editor_app=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Scene Editor v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        tracing::error!("Scene editor failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), HarnessError> {
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            tracing::info!("Loading config from {}", path.display());
            SyncConfig::load(&path)?
        }
        None => SyncConfig::default(),
    };

    let mut harness = Harness::new(&config)?;
    let mut clock = Instant::now();
    let mut tick = |harness: &mut Harness, actions: Vec<UiAction>| -> Result<(), HarnessError> {
        clock += Duration::from_millis(16);
        for outcome in harness.frame(actions, clock)? {
            tracing::debug!("Command outcome: {outcome:?}");
        }
        Ok(())
    };

    tick(
        &mut harness,
        vec![
            UiAction::Add(NodeDescriptor::container().named("Environment")),
            UiAction::Add(NodeDescriptor::mesh(Primitive::Ground)),
            UiAction::Add(NodeDescriptor::mesh(Primitive::Sphere)),
            UiAction::Add(NodeDescriptor::light(LightKind::Directional)),
            UiAction::Add(NodeDescriptor::camera()),
        ],
    )?;
    tick(&mut harness, Vec::new())?;

    if let (Some(env), Some(ground), Some(sphere)) = (
        harness.key_of("Environment"),
        harness.key_of("Ground"),
        harness.key_of("Sphere"),
    ) {
        tick(
            &mut harness,
            vec![
                UiAction::Drop { dragged: ground, target: env },
                UiAction::Drop { dragged: sphere, target: ground },
                UiAction::Click(sphere),
            ],
        )?;
        tick(
            &mut harness,
            vec![
                UiAction::Rename {
                    node: sphere,
                    name: "Planet".to_string(),
                },
                UiAction::ToggleVisibility(ground),
            ],
        )?;
    }
    tick(&mut harness, Vec::new())?;
    log_outline(&harness, "After edits");

    let report = harness.run_assets(demo_assets());
    tracing::info!(
        "Assets finished: {} ok, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    tick(&mut harness, vec![UiAction::Search("Plan".to_string())])?;
    tick(&mut harness, Vec::new())?;
    log_outline(&harness, "Searching \"Plan\"");

    tick(&mut harness, vec![UiAction::Search(String::new()), UiAction::Undo])?;
    tick(&mut harness, Vec::new())?;
    log_outline(&harness, "After undo");

    tracing::info!(
        "Session ended after {} frames with {} nodes",
        harness.frames(),
        harness.scene().len()
    );
    Ok(())
}

fn demo_assets() -> Vec<AssetTask> {
    vec![
        AssetTask::new(ProgressDirection::Load, "environment.glb", |reporter| async move {
            for loaded in (0..=4096).step_by(1024) {
                reporter.report(loaded, 4096);
                tokio::task::yield_now().await;
            }
            Ok(())
        }),
        AssetTask::new(ProgressDirection::Save, "level.scene", |reporter| async move {
            reporter.report(512, 512);
            Ok(())
        })
        .on_success(|| tracing::info!("Level saved")),
    ]
}

fn log_outline(harness: &Harness, heading: &str) {
    tracing::info!("{heading}:");
    for line in harness.outline() {
        tracing::info!("  {line}");
    }
    for indicator in harness.session().assets().indicators() {
        tracing::info!("  [{:?}] {} {}", indicator.phase, indicator.key.direction, indicator.key.name);
    }
}
