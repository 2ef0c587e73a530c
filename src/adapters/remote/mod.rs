//! HTTP adapters for remote collaborators.
//!
//! - **HttpStreamTransport** - opens SSE responses for the streaming client
//! - **HttpActionClient** - calls `external` action endpoints

mod http_action_client;
mod http_stream_transport;

pub use http_action_client::{HttpActionClient, HttpActionClientConfig};
pub use http_stream_transport::{HttpStreamTransport, HttpTransportConfig};
