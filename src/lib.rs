//! ProbeGuard - browser environment probe orchestration.
//!
//! Probes come in two kinds: execution probes run once per activation and
//! resolve a single result, event probes subscribe to environment events and
//! report per occurrence until stopped. A [`queue::Queue`] activates the
//! registered probes at cumulative per-entry delays against one shared
//! [`context::ProbeContext`] and forwards every payload through a single
//! readiness callback.

pub mod config;
pub mod context;
pub mod logging;
pub mod probes;
pub mod queue;
