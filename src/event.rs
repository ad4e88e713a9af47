//! The event bus used to notify listeners of benchmark lifecycle boundaries.
//!
//! Modeled as a plain publish/subscribe registry (the spec treats this as an
//! external collaborator): a mapping from event type to an ordered sequence
//! of listeners, invoked in registration order. Listeners may set
//! [`Event::aborted`] to short-circuit the remaining listeners for this
//! emission, or [`Event::cancelled`] to veto the emitter's default action.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::BenchError;

/// The kind of lifecycle boundary an [`Event`] represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    /// Fired once per benchmark `run`, before the first cycle.
    Start,
    /// Fired once per completed clock batch.
    Cycle,
    /// Fired when `benchmark.error` becomes set.
    Error,
    /// Fired when a benchmark is aborted.
    Abort,
    /// Fired when a benchmark is reset to its constructed state.
    Reset,
    /// Fired exactly once per successful or failed `run`.
    Complete,
    /// Suite-level: fired when a benchmark is added to a suite.
    Add,
}

/// An immutable envelope passed to listeners, carrying the target benchmark's
/// identity and any payload relevant to the boundary being signalled.
#[derive(Clone)]
pub struct Event {
    /// The kind of boundary this event represents.
    pub kind: EventKind,
    /// Id of the benchmark the event logically concerns (after any clone → source rewrite).
    pub target: u64,
    /// Id of the benchmark that is currently dispatching this event.
    pub current_target: u64,
    /// Seconds since the Unix epoch when the event was created.
    pub timestamp: f64,
    /// Set by a listener to stop invoking the remaining listeners for this emission.
    pub aborted: bool,
    /// Set by a listener to veto the emitter's default action.
    pub cancelled: bool,
    /// The error carried by an `Error` event, if any.
    pub error: Option<Arc<BenchError>>,
    /// A free-form message, used by a few boundaries (e.g. `ExceededBudget`).
    pub message: Option<String>,
}

impl Event {
    /// Creates a new event of the given kind, targeting `target`.
    pub fn new(kind: EventKind, target: u64) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        Self {
            kind,
            target,
            current_target: target,
            timestamp,
            aborted: false,
            cancelled: false,
            error: None,
            message: None,
        }
    }

    /// Returns a copy of this event rewritten to a new `target`/`current_target`,
    /// as done when a clone's event is re-emitted on its source (spec §4.5).
    pub fn rewritten_for(&self, target: u64) -> Self {
        let mut ev = self.clone();
        ev.target = target;
        ev.current_target = target;
        ev
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .field("aborted", &self.aborted)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

/// A listener callback. Returning `false` is equivalent to setting
/// `event.cancelled = true` (spec §6: "Listener signature: `(event) => void |
/// false`; returning false cancels.").
pub type Listener = Arc<dyn Fn(&mut Event) -> bool + Send + Sync>;

/// An ordered, per-event-type registry of listeners.
///
/// Cloning an [`EventBus`] shares the underlying listener storage (it is
/// reference-counted), matching how a clone benchmark forwards events to its
/// source through the bus rather than through a cyclic ownership graph.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<HashMap<EventKind, Vec<Listener>>>>,
}

impl EventBus {
    /// Creates an empty event bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for `kind`, appended after any existing listeners.
    pub fn on(&self, kind: EventKind, listener: Listener) {
        self.listeners.lock().entry(kind).or_default().push(listener);
    }

    /// Registers a listener as the *first* listener for `kind`, ahead of any
    /// already registered. Used by the invoker to install its one-shot
    /// completion listener before user listeners (spec §4.6).
    pub fn on_first(&self, kind: EventKind, listener: Listener) {
        self.listeners.lock().entry(kind).or_default().insert(0, listener);
    }

    /// Removes all listeners, or only those for `kind` if given.
    pub fn off(&self, kind: Option<EventKind>) {
        match kind {
            Some(kind) => {
                self.listeners.lock().remove(&kind);
            }
            None => self.listeners.lock().clear(),
        }
    }

    /// Returns the number of listeners currently registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Emits `event` to every listener registered for its kind, in
    /// registration order, stopping early if a listener sets `event.aborted`.
    pub fn emit(&self, event: &mut Event) {
        let listeners = self.listeners.lock().get(&event.kind).cloned().unwrap_or_default();
        for listener in listeners {
            let keep_going = listener(event);
            if !keep_going {
                event.cancelled = true;
            }
            if event.aborted {
                break;
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<EventKind, usize> =
            self.listeners.lock().iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus").field("listener_counts", &counts).finish()
    }
}
