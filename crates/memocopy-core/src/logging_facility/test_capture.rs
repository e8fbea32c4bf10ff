//! In-memory event recording for tests
//!
//! [`init_test_capture`] installs a process-wide subscriber that keeps every
//! event. All tests in one binary share it, so assertions should select
//! events by something only their test produces: a class or hook name, or
//! the call id read off a start event.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::schema;

/// One recorded event, every field rendered as text
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(schema::FIELD_OP)
    }

    pub fn event(&self) -> Option<&str> {
        self.field(schema::FIELD_EVENT)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.field(schema::FIELD_CALL_ID)
    }

    /// Whether this is the `event` boundary of operation `op`
    pub fn is(&self, op: &str, event: &str) -> bool {
        self.op() == Some(op) && self.event() == Some(event)
    }
}

struct FieldText<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldText<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Shared buffer of recorded events
#[derive(Clone, Default)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    pub fn events_named(&self, event: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.event() == Some(event))
    }

    /// Every event logged under the top-level call `call_id`
    pub fn for_call(&self, call_id: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.call_id() == Some(call_id))
    }

    /// Memo fallback diagnostics naming `hook`
    pub fn fallback_diagnostics(&self, hook: &str) -> Vec<CapturedEvent> {
        self.matching(|e| {
            e.event() == Some(schema::EVENT_MEMO_FALLBACK) && e.field(schema::FIELD_HOOK) == Some(hook)
        })
    }

    pub fn matching<F>(&self, predicate: F) -> Vec<CapturedEvent>
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events
            .lock()
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    /// The first `event` boundary of `op`
    ///
    /// # Panics
    ///
    /// Panics if no such event was recorded.
    pub fn expect_event(&self, op: &str, event: &str) -> CapturedEvent {
        let events = self.events.lock();
        match events.iter().find(|e| e.is(op, event)) {
            Some(found) => found.clone(),
            None => panic!(
                "no {event} event for op {op} among {} recorded events",
                events.len()
            ),
        }
    }

    fn record(&self, event: CapturedEvent) {
        self.events.lock().push(event);
    }
}

/// Layer appending every event to a [`TestCapture`]
struct Recorder(TestCapture);

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldText(&mut fields));
        self.0.record(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}

static CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the recording subscriber once and return the shared buffer
///
/// ```
/// use memocopy_core::logging_facility::test_capture::init_test_capture;
/// use memocopy_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_example_op");
/// capture.expect_event("doc_example_op", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    CAPTURE
        .get_or_init(|| {
            let capture = TestCapture::default();
            let installed = tracing_subscriber::registry()
                .with(Recorder(capture.clone()))
                .try_init();
            if installed.is_err() {
                tracing::debug!("another global subscriber is installed; nothing will be recorded");
            }
            capture
        })
        .clone()
}
