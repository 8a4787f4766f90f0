//! Managed Chrome/Chromium session over CDP with a persistent profile.
//!
//! The [`engine`] module defines the capability surface (launch a browser
//! context, drive a page) the rest of herald consumes; [`cdp`] implements it
//! with chromiumoxide. [`session`] owns the one long-lived WhatsApp Web
//! session: lazy initialization, readiness and pairing probes, teardown.

pub mod cdp;
pub mod detect;
pub mod engine;
pub mod error;
pub mod profile;
pub mod session;

pub use {
    cdp::CdpEngine,
    engine::{BrowserEngine, EngineContext, EnginePage, LaunchOptions},
    error::{EngineError, SessionError},
    profile::ProfileStore,
    session::{PairingStatus, SessionController, SessionState},
};
