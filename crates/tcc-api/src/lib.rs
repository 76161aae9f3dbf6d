// tcc-api: Async Rust client for the Honeywell Total Connect Comfort portal

pub mod auth;
mod classify;
pub mod client;
pub mod error;
pub mod models;
mod portal;
pub mod retry;
pub mod session;
pub mod transport;

pub use auth::{AUTH_COOKIE, Credentials};
pub use client::{ClientConfig, ComfortClient, DEFAULT_BASE_URL};
pub use error::Error;
pub use retry::RetryPolicy;
pub use session::SessionManager;
pub use transport::{TlsMode, TransportConfig};
