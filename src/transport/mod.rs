/// HTTPS transport for ACME exchanges
pub mod http_client;
pub mod retry;

pub use http_client::{HttpResponse, HttpTransport, TransportSettings};
pub use retry::Backoff;
