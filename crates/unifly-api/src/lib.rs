//! Async client for the UniFi controller's legacy API.
//!
//! Only the surface a presence watcher needs is modelled: platform
//! detection, cookie-session login/logout and the `stat/sta` listing of
//! currently connected clients.

pub mod auth;
pub mod error;
pub mod legacy;
pub mod transport;

pub use auth::ControllerPlatform;
pub use error::Error;
pub use legacy::LegacyClient;
pub use legacy::models::LegacyClientEntry;
pub use transport::{TlsMode, TransportConfig};
