use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::alert::Alert;
use crate::source::SourceStats;
use crate::vitals::{FusedMetric, RawEvent};

/// A vital reading as broadcast to clients: the raw observation plus the
/// speed layer's fused view at the moment of dispatch.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalPayload {
    #[serde(flatten)]
    pub event: RawEvent,
    pub aggregated: Vec<FusedMetric>,
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialStatePayload {
    pub vitals: Vec<RawEvent>,
    pub alerts: Vec<Alert>,
    pub source_stats: Vec<SourceStats>,
}

/// Every message the broadcast hub can push down a WebSocket connection.
/// Clients de-duplicate `alert` vs `alert_enriched` on `alert_id` since the
/// conversational enricher may race the original alert broadcast.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Vital(VitalPayload),
    Alert(Alert),
    AlertEnriched(Alert),
    InitialState(InitialStatePayload),
    Heartbeat,
    Pong,
}

/// Inbound messages a client may send. Anything else is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}
