//! Driver for an ESP-01 (ESP8266) modem speaking the AT command set over a
//! serial link.
//!
//! [`CommandEngine`] runs one command at a time: it writes the command,
//! then reads into a small rolling window until a known reply marker
//! shows up or the deadline passes. Setup, the web server side and the
//! outbound HTTP client are all built from that single transaction.

pub mod buffer;
pub mod cancel;
pub mod client;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod matcher;
pub mod request;
pub mod server;
pub mod setup;
pub mod state;
pub mod transport;

pub use buffer::{RollingBuffer, DEFAULT_CAPACITY};
pub use cancel::CancelToken;
pub use clock::{Clock, EmbassyClock};
pub use config::{EngineConfig, JoinFailurePolicy};
pub use engine::{command, CommandEngine, Reply, CRLF};
pub use error::{AtError, AtResult};
pub use http::{HttpRequest, Method, RESPONSE_HEAD};
pub use matcher::{Marker, MarkerKind, Match};
pub use request::{parse_request, ParsedRequest};
pub use server::MAX_SEND_LENGTH;
pub use setup::{Credentials, ModeRequest};
pub use state::{ClientId, ConnectionState, WifiMode};
pub use transport::{PipeTransport, Transport};
