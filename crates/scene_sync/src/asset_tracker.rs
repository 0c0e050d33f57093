// SPDX-License-Identifier: MIT OR Apache-2.0
//! Asset load/save progress tracking.
//!
//! Progress events are keyed by operation name, not by task. Loads and
//! saves live in separate maps because one name may be in flight in both
//! directions. Each `(direction, name)` pair drives one status indicator:
//!
//! ```text
//! Absent --first event--> Starting --progress--> Progressing
//!    Starting/Progressing --loaded == total or Complete--> Done
//!    any --Failed--> Failed
//!    Done/Failed --dismiss delay--> removed
//! ```
//!
//! A terminal load resets the whole load map; a terminal save only
//! finalizes its own entry.

use crate::config::AssetConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Whether an operation reads or writes assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressDirection {
    /// Loading into the scene
    Load,
    /// Saving out of the scene
    Save,
}

impl fmt::Display for ProgressDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "Loading"),
            Self::Save => write!(f, "Saving"),
        }
    }
}

/// Kind of progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressKind {
    /// Operation began
    Starting,
    /// Byte/count update
    Progressing,
    /// Explicit completion confirmation
    Complete,
    /// Operation failed
    Failed(String),
}

/// A named progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Load or save
    pub direction: ProgressDirection,
    /// Notification kind
    pub kind: ProgressKind,
    /// Operation name
    pub name: String,
    /// Units done
    pub loaded: u64,
    /// Units expected, 0 when unknown
    pub total: u64,
}

impl ProgressEvent {
    /// A plain progress update
    pub fn progressing(direction: ProgressDirection, name: impl Into<String>, loaded: u64, total: u64) -> Self {
        Self {
            direction,
            kind: ProgressKind::Progressing,
            name: name.into(),
            loaded,
            total,
        }
    }

    /// Operation start
    pub fn starting(direction: ProgressDirection, name: impl Into<String>, total: u64) -> Self {
        Self {
            direction,
            kind: ProgressKind::Starting,
            name: name.into(),
            loaded: 0,
            total,
        }
    }

    /// Completion confirmation
    pub fn complete(direction: ProgressDirection, name: impl Into<String>, total: u64) -> Self {
        Self {
            direction,
            kind: ProgressKind::Complete,
            name: name.into(),
            loaded: total,
            total,
        }
    }

    /// Failure notification
    pub fn failed(direction: ProgressDirection, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            direction,
            kind: ProgressKind::Failed(reason.into()),
            name: name.into(),
            loaded: 0,
            total: 0,
        }
    }

    /// `loaded` has reached a known `total`
    pub fn reached_total(&self) -> bool {
        self.total > 0 && self.loaded >= self.total
    }

    /// Zero of zero units, e.g. an empty file
    pub fn is_empty_transfer(&self) -> bool {
        self.total == 0 && self.loaded == 0
    }
}

/// Lifecycle phase of an entry or indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// First event seen
    Starting,
    /// Updates flowing
    Progressing,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
}

impl Phase {
    /// Whether no further progress is expected
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Progress of one named in-flight operation
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProgressEntry {
    /// Load or save
    pub direction: ProgressDirection,
    /// Current phase
    pub phase: Phase,
    /// Units done, never above a known total
    pub loaded: u64,
    /// Units expected, 0 when unknown
    pub total: u64,
    /// When the last event for this entry arrived
    pub last_event: Instant,
}

/// Identity of a status indicator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndicatorKey {
    /// Load or save
    pub direction: ProgressDirection,
    /// Operation name
    pub name: String,
}

impl IndicatorKey {
    /// Build a key
    pub fn new(direction: ProgressDirection, name: impl Into<String>) -> Self {
        Self {
            direction,
            name: name.into(),
        }
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.name)
    }
}

/// A toast-style status indicator
#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    /// Identity
    pub key: IndicatorKey,
    /// Current phase
    pub phase: Phase,
    /// Completion percentage, `None` while indeterminate
    pub percent: Option<u8>,
    /// Failure reason
    pub message: Option<String>,
    /// When the indicator reached `Done` or `Failed`
    pub finished_at: Option<Instant>,
    /// When an event last touched this indicator
    pub last_event: Instant,
}

/// What the UI should do with its indicators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorEffect {
    /// Create a new indicator
    Show {
        /// Indicator identity
        key: IndicatorKey,
        /// Initial percentage
        percent: Option<u8>,
    },
    /// Update an existing indicator
    Update {
        /// Indicator identity
        key: IndicatorKey,
        /// New percentage
        percent: Option<u8>,
    },
    /// Mark an indicator successful
    Succeed {
        /// Indicator identity
        key: IndicatorKey,
    },
    /// Mark an indicator failed
    Fail {
        /// Indicator identity
        key: IndicatorKey,
        /// Failure reason
        reason: String,
    },
    /// Remove an indicator
    Dismiss {
        /// Indicator identity
        key: IndicatorKey,
    },
}

/// Multiplexes named progress events into per-name indicators
#[derive(Debug)]
pub struct AssetLoadTracker {
    loads: IndexMap<String, LoadProgressEntry>,
    saves: IndexMap<String, LoadProgressEntry>,
    indicators: IndexMap<IndicatorKey, Indicator>,
    config: AssetConfig,
}

impl AssetLoadTracker {
    /// Create an empty tracker
    pub fn new(config: AssetConfig) -> Self {
        Self {
            loads: IndexMap::new(),
            saves: IndexMap::new(),
            indicators: IndexMap::new(),
            config,
        }
    }

    /// Apply one progress event
    pub fn on_event(&mut self, event: &ProgressEvent, now: Instant) -> Vec<IndicatorEffect> {
        let key = IndicatorKey::new(event.direction, event.name.clone());

        if let ProgressKind::Failed(reason) = &event.kind {
            return self.fail(key, reason.clone(), now);
        }

        if !self.map(event.direction).contains_key(&event.name) {
            return self.begin(key, event, now);
        }
        let Some(entry) = self.map_mut(event.direction).get_mut(&event.name) else {
            return Vec::new();
        };

        if event.kind == ProgressKind::Starting {
            entry.loaded = 0;
            entry.phase = Phase::Starting;
        }
        if event.total > 0 {
            entry.total = event.total;
        }
        // Out-of-order duplicates must not move progress backwards
        entry.loaded = entry.loaded.max(event.loaded);
        if entry.total > 0 {
            entry.loaded = entry.loaded.min(entry.total);
        }
        entry.last_event = now;

        if event.kind == ProgressKind::Complete || event.reached_total() {
            return self.finish(key, now);
        }

        if event.kind != ProgressKind::Starting {
            entry.phase = Phase::Progressing;
        }
        let percent = percent_of(entry.loaded, entry.total);
        vec![self.show(key, percent, now)]
    }

    /// Mark an operation failed, e.g. from a task's error callback
    pub fn on_task_failed(
        &mut self,
        direction: ProgressDirection,
        name: &str,
        reason: impl Into<String>,
        now: Instant,
    ) -> Vec<IndicatorEffect> {
        self.fail(IndicatorKey::new(direction, name), reason.into(), now)
    }

    /// Dismiss finished indicators and fail stalled entries
    pub fn tick(&mut self, now: Instant) -> Vec<IndicatorEffect> {
        let mut effects = Vec::new();

        if let Some(timeout) = self.config.stall_timeout() {
            let mut stalled: Vec<IndicatorKey> = self
                .loads
                .iter()
                .chain(self.saves.iter())
                .filter(|(_, entry)| now.saturating_duration_since(entry.last_event) >= timeout)
                .map(|(name, entry)| IndicatorKey::new(entry.direction, name.clone()))
                .collect();
            // Indicators whose entry is gone, e.g. reset by another load finishing
            stalled.extend(
                self.indicators
                    .values()
                    .filter(|ind| !ind.phase.is_terminal())
                    .filter(|ind| !self.map(ind.key.direction).contains_key(&ind.key.name))
                    .filter(|ind| now.saturating_duration_since(ind.last_event) >= timeout)
                    .map(|ind| ind.key.clone()),
            );
            for key in stalled {
                tracing::warn!("No progress for {key} in {timeout:?}");
                effects.extend(self.fail(key, "Stalled".to_string(), now));
            }
        }

        let delay = self.config.dismiss_delay();
        let expired: Vec<IndicatorKey> = self
            .indicators
            .values()
            .filter(|ind| {
                ind.finished_at
                    .is_some_and(|at| now.saturating_duration_since(at) >= delay)
            })
            .map(|ind| ind.key.clone())
            .collect();
        for key in expired {
            self.indicators.shift_remove(&key);
            effects.push(IndicatorEffect::Dismiss { key });
        }

        effects
    }

    /// In-flight entry for a name
    pub fn entry(&self, direction: ProgressDirection, name: &str) -> Option<&LoadProgressEntry> {
        self.map(direction).get(name)
    }

    /// In-flight loads
    pub fn loads(&self) -> &IndexMap<String, LoadProgressEntry> {
        &self.loads
    }

    /// In-flight saves
    pub fn saves(&self) -> &IndexMap<String, LoadProgressEntry> {
        &self.saves
    }

    /// Indicators in creation order
    pub fn indicators(&self) -> impl Iterator<Item = &Indicator> {
        self.indicators.values()
    }

    /// Indicator for a key
    pub fn indicator(&self, key: &IndicatorKey) -> Option<&Indicator> {
        self.indicators.get(key)
    }

    fn map(&self, direction: ProgressDirection) -> &IndexMap<String, LoadProgressEntry> {
        match direction {
            ProgressDirection::Load => &self.loads,
            ProgressDirection::Save => &self.saves,
        }
    }

    fn map_mut(&mut self, direction: ProgressDirection) -> &mut IndexMap<String, LoadProgressEntry> {
        match direction {
            ProgressDirection::Load => &mut self.loads,
            ProgressDirection::Save => &mut self.saves,
        }
    }

    fn begin(&mut self, key: IndicatorKey, event: &ProgressEvent, now: Instant) -> Vec<IndicatorEffect> {
        let redundant = match event.kind {
            ProgressKind::Complete => true,
            ProgressKind::Progressing => event.reached_total() || event.is_empty_transfer(),
            _ => false,
        };
        if redundant {
            // Nothing new unless an indicator is still waiting for this name,
            // e.g. after a terminal load reset the map under it
            if self.indicators.get(&key).is_some_and(|ind| !ind.phase.is_terminal()) {
                return self.finish(key, now);
            }
            tracing::trace!("Ignoring terminal progress for untracked {key}");
            return Vec::new();
        }

        let loaded = if event.total > 0 {
            event.loaded.min(event.total)
        } else {
            event.loaded
        };
        self.map_mut(key.direction).insert(
            key.name.clone(),
            LoadProgressEntry {
                direction: key.direction,
                phase: Phase::Starting,
                loaded,
                total: event.total,
                last_event: now,
            },
        );
        tracing::debug!("{key} started");

        vec![self.show(key, percent_of(loaded, event.total), now)]
    }

    fn show(&mut self, key: IndicatorKey, percent: Option<u8>, now: Instant) -> IndicatorEffect {
        match self.indicators.get_mut(&key) {
            Some(ind) if !ind.phase.is_terminal() => {
                ind.phase = Phase::Progressing;
                ind.percent = percent;
                ind.last_event = now;
                IndicatorEffect::Update { key, percent }
            }
            _ => {
                self.indicators.insert(
                    key.clone(),
                    Indicator {
                        key: key.clone(),
                        phase: Phase::Starting,
                        percent,
                        message: None,
                        finished_at: None,
                        last_event: now,
                    },
                );
                IndicatorEffect::Show { key, percent }
            }
        }
    }

    fn finish(&mut self, key: IndicatorKey, now: Instant) -> Vec<IndicatorEffect> {
        match key.direction {
            // A finished load ends the loading session
            ProgressDirection::Load => self.loads.clear(),
            ProgressDirection::Save => {
                self.saves.shift_remove(&key.name);
            }
        }

        let ind = self.indicators.entry(key.clone()).or_insert_with(|| Indicator {
            key: key.clone(),
            phase: Phase::Starting,
            percent: None,
            message: None,
            finished_at: None,
            last_event: now,
        });
        ind.phase = Phase::Done;
        ind.percent = Some(100);
        ind.finished_at = Some(now);
        ind.last_event = now;

        tracing::info!("{key} finished");
        vec![IndicatorEffect::Succeed { key }]
    }

    fn fail(&mut self, key: IndicatorKey, reason: String, now: Instant) -> Vec<IndicatorEffect> {
        self.map_mut(key.direction).shift_remove(&key.name);

        let mut effects = Vec::new();
        if !self.indicators.contains_key(&key) {
            effects.push(IndicatorEffect::Show {
                key: key.clone(),
                percent: None,
            });
        }
        let ind = self.indicators.entry(key.clone()).or_insert_with(|| Indicator {
            key: key.clone(),
            phase: Phase::Starting,
            percent: None,
            message: None,
            finished_at: None,
            last_event: now,
        });
        ind.phase = Phase::Failed;
        ind.message = Some(reason.clone());
        ind.finished_at = Some(now);
        ind.last_event = now;

        tracing::warn!("{key} failed: {reason}");
        effects.push(IndicatorEffect::Fail { key, reason });
        effects
    }
}

impl Default for AssetLoadTracker {
    fn default() -> Self {
        Self::new(AssetConfig::default())
    }
}

fn percent_of(loaded: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let pct = loaded.min(total).saturating_mul(100) / total;
    Some(pct as u8)
}
