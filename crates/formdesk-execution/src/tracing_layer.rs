//! Tracing layer that forwards log events to an in-process consumer.
//!
//! The console uses it to keep a scrollback of recent log lines without
//! printing them over the prompt.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// One forwarded log record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LogEvent {
    /// Event target (e.g., "formdesk_application::conversation_service")
    pub target: String,
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    pub message: String,
    /// Structured fields other than the message
    pub fields: HashMap<String, Value>,
    /// Names of the enclosing spans, outermost first
    pub spans: Vec<String>,
    pub timestamp: String,
}

impl LogEvent {
    /// Single-line rendering used by the console log view.
    pub fn render(&self) -> String {
        let mut line = format!("{} {:5} {}", self.timestamp, self.level, self.message);
        if !self.fields.is_empty() {
            let mut keys: Vec<&String> = self.fields.keys().collect();
            keys.sort();
            for key in keys {
                line.push_str(&format!(" {}={}", key, self.fields[key]));
            }
        }
        line
    }
}

/// Sends every event it sees to an unbounded channel.
pub struct LogForwardLayer {
    sender: mpsc::UnboundedSender<LogEvent>,
}

impl LogForwardLayer {
    pub fn new(sender: mpsc::UnboundedSender<LogEvent>) -> Self {
        Self { sender }
    }
}

impl<S> Layer<S> for LogForwardLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let spans = ctx
            .event_scope(event)
            .map(|scope| {
                scope
                    .from_root()
                    .map(|span| span.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let message = match fields.remove("message") {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let log_event = LogEvent {
            target: event.metadata().target().to_string(),
            level: event.metadata().level().to_string(),
            message,
            fields,
            spans,
            timestamp: chrono::Utc::now().format("%H:%M:%S%.3f").to_string(),
        };

        // The receiver may be gone; logging must never fail because of it.
        let _ = self.sender.send(log_event);
    }
}

/// Field visitor that extracts tracing event fields into a HashMap
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_events_are_forwarded_with_fields_and_spans() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscriber = tracing_subscriber::registry().with(LogForwardLayer::new(tx));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("handoff");
            let _guard = span.enter();
            tracing::warn!(recipient = 42, "delivery failed");
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event.level, "WARN");
        assert_eq!(event.message, "delivery failed");
        assert_eq!(event.fields["recipient"], serde_json::json!(42));
        assert_eq!(event.spans, vec!["handoff".to_string()]);
        assert!(event.render().contains("recipient=42"));
    }
}
