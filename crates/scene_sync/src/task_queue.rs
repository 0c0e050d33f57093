// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named asset load/save task queue.
//!
//! Tasks are queued with a name and an async body; [`AssetTaskQueue::load`]
//! runs everything queued so far and publishes progress for each task on
//! the matching direction channel. Nothing here blocks the thread.

use crate::asset_tracker::{ProgressDirection, ProgressEvent};
use crate::events::{EventChannel, SceneEvents};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

/// Errors reported by task bodies
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The asset could not be fetched or stored
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// The asset data could not be decoded or encoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

/// Handed to a task body so it can report progress under its name
#[derive(Clone)]
pub struct ProgressReporter {
    direction: ProgressDirection,
    name: String,
    channel: EventChannel<ProgressEvent>,
    last: Arc<Mutex<(u64, u64)>>,
}

impl ProgressReporter {
    fn new(direction: ProgressDirection, name: String, channel: EventChannel<ProgressEvent>) -> Self {
        Self {
            direction,
            name,
            channel,
            last: Arc::new(Mutex::new((0, 0))),
        }
    }

    /// Publish a progress update
    pub fn report(&self, loaded: u64, total: u64) {
        *self.last.lock() = (loaded, total);
        self.channel
            .publish(ProgressEvent::progressing(self.direction, self.name.clone(), loaded, total));
    }

    /// Task name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last reported `(loaded, total)`
    pub fn last(&self) -> (u64, u64) {
        *self.last.lock()
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("direction", &self.direction)
            .field("name", &self.name)
            .finish()
    }
}

type TaskBody = Box<dyn FnOnce(ProgressReporter) -> BoxFuture<'static, Result<(), TaskError>> + Send>;

/// A queued load or save
pub struct AssetTask {
    name: String,
    direction: ProgressDirection,
    body: TaskBody,
    on_success: Option<Box<dyn FnOnce() + Send>>,
    on_error: Option<Box<dyn FnOnce(&TaskError) + Send>>,
}

impl AssetTask {
    /// Create a task from an async body
    pub fn new<F, Fut>(direction: ProgressDirection, name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(ProgressReporter) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            direction,
            body: Box::new(move |reporter| Box::pin(body(reporter))),
            on_success: None,
            on_error: None,
        }
    }

    /// Callback run after the body succeeds
    pub fn on_success(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Callback run after the body fails
    pub fn on_error(mut self, callback: impl FnOnce(&TaskError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Task name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load or save
    pub fn direction(&self) -> ProgressDirection {
        self.direction
    }
}

impl std::fmt::Debug for AssetTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetTask")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

/// Outcome of one [`AssetTaskQueue::load`] run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueueReport {
    /// Names of tasks that succeeded
    pub succeeded: Vec<String>,
    /// Names and errors of tasks that failed
    pub failed: Vec<(String, TaskError)>,
}

/// Queue of named asset tasks
pub struct AssetTaskQueue {
    tasks: Vec<AssetTask>,
    load_progress: EventChannel<ProgressEvent>,
    save_progress: EventChannel<ProgressEvent>,
    max_concurrent: usize,
}

impl AssetTaskQueue {
    /// Create a queue publishing on the scene's progress channels
    pub fn new(events: &SceneEvents, max_concurrent: usize) -> Self {
        Self {
            tasks: Vec::new(),
            load_progress: events.load_progress.clone(),
            save_progress: events.save_progress.clone(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Enqueue a task
    pub fn add_task(&mut self, task: AssetTask) {
        tracing::debug!("Queued {:?} task {}", task.direction, task.name);
        self.tasks.push(task);
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every queued task and wait for all of them
    pub async fn load(&mut self) -> QueueReport {
        let tasks = std::mem::take(&mut self.tasks);
        tracing::info!("Processing {} asset tasks", tasks.len());

        let runs = tasks.into_iter().map(|task| {
            let channel = match task.direction {
                ProgressDirection::Load => self.load_progress.clone(),
                ProgressDirection::Save => self.save_progress.clone(),
            };
            run_task(task, channel)
        });
        let results: Vec<(String, Result<(), TaskError>)> = stream::iter(runs)
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut report = QueueReport::default();
        for (name, result) in results {
            match result {
                Ok(()) => report.succeeded.push(name),
                Err(err) => report.failed.push((name, err)),
            }
        }
        report
    }
}

impl std::fmt::Debug for AssetTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetTaskQueue")
            .field("tasks", &self.tasks)
            .field("max_concurrent", &self.max_concurrent)
            .finish()
    }
}

async fn run_task(task: AssetTask, channel: EventChannel<ProgressEvent>) -> (String, Result<(), TaskError>) {
    let AssetTask {
        name,
        direction,
        body,
        on_success,
        on_error,
    } = task;

    let reporter = ProgressReporter::new(direction, name.clone(), channel.clone());
    channel.publish(ProgressEvent::starting(direction, name.clone(), 0));

    let result = body(reporter.clone()).await;
    match &result {
        Ok(()) => {
            let (_, total) = reporter.last();
            channel.publish(ProgressEvent::complete(direction, name.clone(), total));
            if let Some(callback) = on_success {
                callback();
            }
        }
        Err(err) => {
            tracing::warn!("Asset task {name} failed: {err}");
            channel.publish(ProgressEvent::failed(direction, name.clone(), err.to_string()));
            if let Some(callback) = on_error {
                callback(err);
            }
        }
    }
    (name, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_tracker::{AssetLoadTracker, Phase, ProgressKind};
    use futures::executor::block_on;
    use std::time::Instant;

    #[test]
    fn test_progress_reaches_tracker() {
        let events = SceneEvents::new();
        let mut progress = events.load_progress.subscribe();
        let mut queue = AssetTaskQueue::new(&events, 4);

        queue.add_task(AssetTask::new(ProgressDirection::Load, "mesh.glb", |reporter| async move {
            for loaded in [0, 5, 10] {
                reporter.report(loaded, 10);
            }
            Ok(())
        }));
        assert_eq!(queue.len(), 1);

        let report = block_on(queue.load());
        assert_eq!(report.succeeded, vec!["mesh.glb".to_string()]);
        assert!(queue.is_empty());

        let mut tracker = AssetLoadTracker::default();
        let now = Instant::now();
        for event in progress.drain() {
            tracker.on_event(&event, now);
        }
        let indicator = tracker.indicators().next().unwrap();
        assert_eq!(indicator.phase, Phase::Done);
        assert_eq!(tracker.indicators().count(), 1);
        assert!(tracker.loads().is_empty());
    }

    #[test]
    fn test_failure_runs_error_callback() {
        let events = SceneEvents::new();
        let mut progress = events.save_progress.subscribe();
        let mut queue = AssetTaskQueue::new(&events, 2);
        let seen = Arc::new(Mutex::new(None));
        let succeeded = Arc::new(Mutex::new(false));

        let seen_in_cb = Arc::clone(&seen);
        let ok_in_cb = Arc::clone(&succeeded);
        queue.add_task(
            AssetTask::new(ProgressDirection::Save, "scene.json", |reporter| async move {
                reporter.report(1, 3);
                Err(TaskError::Transfer("bucket unavailable".to_string()))
            })
            .on_success(move || *ok_in_cb.lock() = true)
            .on_error(move |err| *seen_in_cb.lock() = Some(err.clone())),
        );

        let report = block_on(queue.load());
        assert_eq!(report.failed.len(), 1);
        assert!(!*succeeded.lock());
        assert_eq!(
            *seen.lock(),
            Some(TaskError::Transfer("bucket unavailable".to_string()))
        );

        let kinds: Vec<_> = progress.drain().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds.len(), 3);
        assert_eq!(kinds[0], ProgressKind::Starting);
        assert!(matches!(kinds[2], ProgressKind::Failed(_)));
    }

    #[test]
    fn test_single_slot_runs_in_order() {
        let events = SceneEvents::new();
        let mut progress = events.load_progress.subscribe();
        let mut queue = AssetTaskQueue::new(&events, 1);

        for name in ["a", "b"] {
            queue.add_task(AssetTask::new(ProgressDirection::Load, name, |reporter| async move {
                reporter.report(1, 1);
                Ok(())
            }));
        }
        let report = block_on(queue.load());
        assert_eq!(report.succeeded, vec!["a".to_string(), "b".to_string()]);

        let names: Vec<_> = progress.drain().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["a", "a", "a", "b", "b", "b"]);
    }

    #[test]
    fn test_empty_queue() {
        let events = SceneEvents::new();
        let mut queue = AssetTaskQueue::new(&events, 0);
        assert_eq!(block_on(queue.load()), QueueReport::default());
    }
}
