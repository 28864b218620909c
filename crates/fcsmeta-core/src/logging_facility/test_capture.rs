//! Recording subscriber for tests
//!
//! `init_test_capture()` installs a layer that keeps every event in memory.
//! The buffer is process-wide, so each test should use an operation name no
//! other test emits and read back through `events_for_op`.

use fcsmeta_core_types::schema::{FIELD_EVENT, FIELD_OP};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

type Buffer = Arc<Mutex<Vec<CapturedEvent>>>;

/// One recorded event. Every field is stored in its display form.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub op: Option<String>,
    pub event: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn from_tracing(event: &Event<'_>) -> Self {
        let mut fields = FieldMap::default();
        event.record(&mut fields);
        let fields = fields.0;
        Self {
            level: *event.metadata().level(),
            op: fields.get(FIELD_OP).cloned(),
            event: fields.get(FIELD_EVENT).cloned(),
            fields,
        }
    }

    fn is(&self, op: &str, event: &str) -> bool {
        self.op.as_deref() == Some(op) && self.event.as_deref() == Some(event)
    }
}

#[derive(Default)]
struct FieldMap(HashMap<String, String>);

impl FieldMap {
    fn put(&mut self, field: &Field, value: String) {
        self.0.insert(field.name().to_owned(), value);
    }
}

impl Visit for FieldMap {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{:?}", value));
    }
}

struct Recorder(Buffer);

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let captured = CapturedEvent::from_tracing(event);
        if let Ok(mut buffer) = self.0.lock() {
            buffer.push(captured);
        }
    }
}

/// Read side of the shared capture buffer.
#[derive(Clone)]
pub struct TestCapture {
    buffer: Buffer,
}

impl TestCapture {
    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        match self.buffer.lock() {
            Ok(buffer) => buffer.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Events whose `op` field equals `op`, oldest first.
    pub fn events_for_op(&self, op: &str) -> Vec<CapturedEvent> {
        let mut events = self.events();
        events.retain(|e| e.op.as_deref() == Some(op));
        events
    }

    /// # Panics
    ///
    /// When no recorded event carries both `op` and `event`.
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let events = self.events();
        assert!(
            events.iter().any(|e| e.is(op, event)),
            "no {}/{} event among {} recorded",
            op,
            event,
            events.len()
        );
    }
}

static CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Handle to the process-wide capture buffer, installing the recording
/// subscriber on first use.
pub fn init_test_capture() -> TestCapture {
    CAPTURE
        .get_or_init(|| {
            let buffer = Buffer::default();
            let installed = tracing_subscriber::registry()
                .with(Recorder(Arc::clone(&buffer)))
                .try_init();
            debug_assert!(installed.is_ok(), "another global subscriber is active");
            TestCapture { buffer }
        })
        .clone()
}
