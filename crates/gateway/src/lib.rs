//! Admin HTTP gateway for the messaging session.
//!
//! A thin axum layer over [`herald_browser::SessionController`] and
//! [`herald_whatsapp::Dispatcher`]: pairing status with an inline QR
//! image, single and bulk sends, health. Operator authentication is the
//! deployment's concern, not this crate's.

pub mod routes;
pub mod server;

pub use server::{AppState, build_app, serve};
