//! Streaming module - the typed event protocol carried over SSE.
//!
//! Events travel as `data: <json>` lines and the stream ends with
//! `data: [DONE]` or connection close. [`SseDecoder`] turns arbitrarily
//! fragmented byte chunks back into [`StreamEvent`]s.

mod decoder;
mod event;
mod request;
mod state;

pub use decoder::{SseDecoder, SseItem, DONE_MARKER, MAX_LINE_BYTES};
pub use event::{
    ActionStatus, ActionsPayload, ContentPayload, DonePayload, ErrorPayload, InvocationStatus,
    MetadataPayload, StreamEvent, UiPayload,
};
pub use request::ChatRequest;
pub use state::StreamState;
