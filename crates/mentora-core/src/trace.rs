// Run tracing
//
// A Trace is the record of one run's lifecycle: created at run start,
// mutated only by recording events against it and by a single terminal
// status transition. The Tracer trait is the persistence seam - the
// in-process default records nothing; production deployments back `record`
// with durable storage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Mutex;
use uuid::Uuid;

use crate::event::Event;

/// Trace lifecycle status; exactly one terminal transition per trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Running,
    Success,
    Error,
}

/// The record of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub version: String,
    pub payload: Map<String, Value>,
    pub status: TraceStatus,
}

impl Trace {
    /// Allocate a fresh running trace
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        version: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            version: version.into(),
            payload,
            status: TraceStatus::Running,
        }
    }

    /// Apply the terminal status. Only the first transition takes effect;
    /// a finished trace never changes again.
    pub fn finish(&mut self, status: TraceStatus) {
        if self.status == TraceStatus::Running {
            self.status = status;
        }
    }
}

/// Persistence seam for traces and their events.
pub trait Tracer: Send + Sync {
    /// Open a trace for a run
    fn start(
        &self,
        entity_type: &str,
        entity_id: &str,
        version: &str,
        payload: Map<String, Value>,
    ) -> Trace {
        Trace::new(entity_type, entity_id, version, payload)
    }

    /// Record one event against a trace. Called strictly before the event
    /// is yielded to the run's consumer.
    fn record(&self, trace: &Trace, event: &Event);

    /// Apply the terminal status
    fn finish(&self, trace: &mut Trace, status: TraceStatus) {
        trace.finish(status);
    }
}

/// Tracer that keeps nothing. The in-process default.
#[derive(Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn record(&self, _trace: &Trace, _event: &Event) {}
}

/// Tracer that collects recorded events and finished traces in memory,
/// for tests and local inspection.
#[derive(Default)]
pub struct RecordingTracer {
    events: Mutex<Vec<(Uuid, Event)>>,
    finished: Mutex<Vec<Trace>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, paired with their trace ids
    pub fn events(&self) -> Vec<(Uuid, Event)> {
        self.events.lock().unwrap().clone()
    }

    /// Traces that reached a terminal status
    pub fn finished(&self) -> Vec<Trace> {
        self.finished.lock().unwrap().clone()
    }
}

impl Tracer for RecordingTracer {
    fn record(&self, trace: &Trace, event: &Event) {
        self.events.lock().unwrap().push((trace.id, event.clone()));
    }

    fn finish(&self, trace: &mut Trace, status: TraceStatus) {
        trace.finish(status);
        self.finished.lock().unwrap().push(trace.clone());
    }
}
