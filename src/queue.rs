//! Probe scheduling and dispatch.
//!
//! A queue owns an ordered list of (probe, delay) entries bound to one
//! execution context and one readiness callback. `start` arms one timer per
//! entry at the cumulative offset of all delays registered up to and
//! including it; `stop` cancels pending activations and unsubscribes event
//! probes that were armed. Every probe result, success or failure, reaches
//! the caller through the shared callback.

use std::time::Duration;

use thiserror::Error;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::ProbeContext;
use crate::probes::types::{Probe, ReadinessCallback, ReadinessPayload};

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("queue \"{queue}\" already started; probes must be registered before start")]
    AlreadyStarted { queue: String },
}

/// A registered probe with its relative delay and, once armed, the
/// cancellation token for its activation. The token appears at `start` and
/// is taken the first time `stop` tears the entry down.
struct QueueEntry {
    probe: Probe,
    delay: Duration,
    scheduled: Option<CancellationToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueState {
    Idle,
    Running,
    Stopped,
}

/// Absolute activation offsets for an ordered delay list: entry `i` fires
/// at the running sum of delays `0..=i`, not after an independent wait.
pub fn activation_offsets(delays: &[Duration]) -> Vec<Duration> {
    let mut total = Duration::ZERO;
    delays
        .iter()
        .map(|delay| {
            total += *delay;
            total
        })
        .collect()
}

pub struct Queue {
    name: String,
    cx: ProbeContext,
    ready: ReadinessCallback,
    entries: Vec<QueueEntry>,
    state: QueueState,
}

impl Queue {
    pub fn new(name: impl Into<String>, cx: ProbeContext, ready: ReadinessCallback) -> Self {
        Self {
            name: name.into(),
            cx,
            ready,
            entries: Vec::new(),
            state: QueueState::Idle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.state == QueueState::Running
    }

    /// Registers `probe` to activate `delay` after the previously
    /// registered entry. Fails once the queue has started; the entry list
    /// is left unchanged on failure.
    pub fn add(&mut self, probe: Probe, delay: Duration) -> Result<(), QueueError> {
        if self.state != QueueState::Idle {
            return Err(QueueError::AlreadyStarted {
                queue: self.name.clone(),
            });
        }
        debug!(
            queue = %self.name,
            probe = probe.name(),
            kind = probe.kind().name(),
            delay_ms = delay.as_millis() as u64,
            "probe registered"
        );
        self.entries.push(QueueEntry {
            probe,
            delay,
            scheduled: None,
        });
        Ok(())
    }

    /// Arms one timer per entry at its cumulative offset. Entries with
    /// equal offsets fire in registration order. A second call is ignored.
    pub fn start(&mut self) {
        if self.state != QueueState::Idle {
            warn!(queue = %self.name, "start ignored: queue already started");
            return;
        }
        self.state = QueueState::Running;

        let delays: Vec<Duration> = self.entries.iter().map(|entry| entry.delay).collect();
        let offsets = activation_offsets(&delays);
        info!(queue = %self.name, probes = self.entries.len(), "queue started");

        for (entry, offset) in self.entries.iter_mut().zip(offsets) {
            let token = CancellationToken::new();
            let task_token = token.clone();
            let probe = entry.probe.clone();
            let cx = self.cx.clone();
            let ready = self.ready.clone();
            let queue = self.name.clone();
            tokio::spawn(async move {
                select! {
                    _ = task_token.cancelled() => {
                        debug!(queue = %queue, probe = probe.name(), "activation cancelled before firing");
                    }
                    _ = tokio::time::sleep(offset) => {
                        dispatch(&queue, probe, cx, ready).await;
                    }
                }
            });
            entry.scheduled = Some(token);
        }
    }

    /// Cancels every pending activation and, for event probes that were
    /// armed, calls their `stop`. Already-fired execution probes are left
    /// untouched; in-flight work is not cancelled. Entries torn down by a
    /// previous call are skipped, so repeated stops never double-stop a
    /// probe.
    pub async fn stop(&mut self) {
        if self.state != QueueState::Running {
            debug!(queue = %self.name, "stop ignored: queue not running");
            return;
        }
        self.state = QueueState::Stopped;
        info!(queue = %self.name, "queue stopping");

        for entry in &mut self.entries {
            if let Some(token) = entry.scheduled.take() {
                token.cancel();
                if let Probe::Event(probe) = &entry.probe {
                    if let Err(error) = probe.stop().await {
                        warn!(
                            queue = %self.name,
                            probe = probe.name(),
                            error = %error,
                            "event probe stop failed"
                        );
                    }
                }
            }
        }
    }
}

/// Per-entry dispatch. A failing probe is reported through the readiness
/// callback as an error payload; entries are independently timed, so the
/// failure disturbs nothing else in the queue.
async fn dispatch(queue: &str, probe: Probe, cx: ProbeContext, ready: ReadinessCallback) {
    match probe {
        Probe::Exec(probe) => {
            debug!(queue, probe = probe.name(), "exec probe activating");
            match probe.exec(&cx).await {
                Ok(payload) => ready(payload),
                Err(error) => {
                    warn!(queue, probe = probe.name(), error = %error, "exec probe failed");
                    ready(ReadinessPayload::error(queue, probe.name(), &error));
                }
            }
        }
        Probe::Event(probe) => {
            debug!(queue, probe = probe.name(), "event probe starting");
            if let Err(error) = probe.start(cx, ready.clone()).await {
                warn!(queue, probe = probe.name(), error = %error, "event probe start failed");
                ready(ReadinessPayload::error(queue, probe.name(), &error));
            }
        }
    }
}
