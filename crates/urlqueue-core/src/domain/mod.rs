//! Domain model (IDs, request shapes, attempt results, task state, errors).

pub mod attempts;
pub mod errors;
pub mod ids;
pub mod request;
pub mod response;
pub mod state;

pub use attempts::AttemptLimit;
pub use errors::{TransportError, UrlQueueError};
pub use ids::{QueueId, TaskId};
pub use request::{Payload, PayloadKind, RequestDescriptor};
pub use response::{AttemptReport, Completion, ResponseMeta};
pub use state::{TaskOutcome, TaskSnapshot, TaskState};
