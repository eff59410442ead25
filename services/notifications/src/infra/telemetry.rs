use tracing::info;

use crate::domain::repository::TelemetryClient;
use crate::domain::types::TelemetryEvent;

/// Emits telemetry events as structured logs on the `telemetry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetryClient for TracingTelemetry {
    fn track_event(&self, event: TelemetryEvent) {
        let properties = serde_json::to_string(&event.properties).unwrap_or_default();
        info!(
            target: "telemetry",
            event = %event.name,
            properties = %properties,
            "telemetry event"
        );
    }
}
