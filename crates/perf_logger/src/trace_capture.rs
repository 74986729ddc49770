//! Test subscriber that records the target of every event.

use std::sync::{Arc, Mutex};

use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Metadata, Subscriber};

#[derive(Clone, Default)]
struct TargetRecorder {
    targets: Arc<Mutex<Vec<String>>>,
}

impl Subscriber for TargetRecorder {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        self.targets
            .lock()
            .unwrap()
            .push(event.metadata().target().to_string());
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Run `f` and return the targets of the events it emitted on this thread.
pub(crate) fn event_targets(f: impl FnOnce()) -> Vec<String> {
    let recorder = TargetRecorder::default();
    tracing::subscriber::with_default(recorder.clone(), f);
    let targets = recorder.targets.lock().unwrap().clone();
    targets
}
