pub mod alert;
pub mod baseline;
pub mod source;
pub mod stream;
pub mod vitals;

pub use alert::{Alert, AlertSeverity, AlertType};
pub use baseline::Baseline;
pub use source::{SourceId, SourceProfile, SourceStats};
pub use stream::{ClientMessage, InitialStatePayload, ServerMessage, VitalPayload};
pub use vitals::{ContributingSource, FusedMetric, PhysiologicalState, RawEvent, VitalField};
