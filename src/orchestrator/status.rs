/// Status broadcasts
///
/// Every transition the core applies is surfaced to observers (the UI
/// gateway) as a tagged status / category / payload tuple.
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::messaging::topology;
use crate::messaging::{
    BusConnection, CommandCode, FixedRoute, NotificationInfo, SignalSender, StatusCategory,
};

const LOG_TARGET_STATUS: &str = "devbus::status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub status: Status,
    pub category: StatusCategory,
    pub payload: Value,
}

impl StatusUpdate {
    pub fn ok(category: StatusCategory, payload: Value) -> Self {
        Self {
            status: Status::Ok,
            category,
            payload,
        }
    }

    pub fn failed(category: StatusCategory, payload: Value) -> Self {
        Self {
            status: Status::Failed,
            category,
            payload,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

// StatusCategory is a wire code; serialize it by label
impl Serialize for StatusCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.description())
    }
}

/// Observer of status broadcasts
pub trait StatusSink: Send + Sync + 'static {
    fn publish(&self, update: StatusUpdate);
}

/// Writes status broadcasts to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn publish(&self, update: StatusUpdate) {
        match update.status {
            Status::Ok => info!(
                target: LOG_TARGET_STATUS,
                "[{}] {}",
                update.category.description(),
                update.payload
            ),
            Status::Failed => warn!(
                target: LOG_TARGET_STATUS,
                "[{}] failed: {}",
                update.category.description(),
                update.payload
            ),
        }
    }
}

/// Emits status broadcasts on the core status endpoint: category code,
/// success flag, and the JSON payload in `info.message`.
#[derive(Clone)]
pub struct BusStatusSink {
    sender: SignalSender<StatusCategory>,
}

impl BusStatusSink {
    pub fn new(bus: Arc<dyn BusConnection>) -> Self {
        Self {
            sender: SignalSender::new(bus, FixedRoute(topology::core_status())),
        }
    }
}

impl StatusSink for BusStatusSink {
    fn publish(&self, update: StatusUpdate) {
        let info = NotificationInfo::new().with_message(update.payload.to_string());
        self.sender
            .send_notification(update.category, update.is_ok(), info);
    }
}

/// Publish to both sinks
impl<A: StatusSink, B: StatusSink> StatusSink for (A, B) {
    fn publish(&self, update: StatusUpdate) {
        self.0.publish(update.clone());
        self.1.publish(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{LoopbackBus, SignalMatch, SignalMessage};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_status_update_serializes_labels() {
        let update = StatusUpdate::failed(StatusCategory::Record, json!({"state": "stopped"}));
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"status": "failed", "category": "record", "payload": {"state": "stopped"}})
        );
    }

    #[test]
    fn test_bus_sink_emits_status_signal() {
        let bus = LoopbackBus::new();
        let gateway = bus.connect("gateway");
        let inbox = gateway
            .subscribe(&SignalMatch::for_endpoint(&topology::core_status()))
            .unwrap();

        let sink = (
            LogStatusSink,
            BusStatusSink::new(Arc::new(bus.connect(topology::CORE_SERVICE))),
        );
        sink.publish(StatusUpdate::ok(StatusCategory::Power, json!({"state": "on"})));

        let batch = gateway.poll(&inbox, Duration::from_millis(100)).unwrap();
        assert_eq!(batch.len(), 1);
        let message = SignalMessage::<StatusCategory>::decode(&batch[0].args).unwrap();
        assert_eq!(message.command(), StatusCategory::Power);
        let SignalMessage::Notification { success, info, .. } = message else {
            panic!("status is notification-shaped");
        };
        assert!(success);
        let payload: Value = serde_json::from_str(&info.message).unwrap();
        assert_eq!(payload, json!({"state": "on"}));
    }
}
