//! WhatsApp Web messaging on top of the managed browser session.
//!
//! [`phone`] normalizes raw recipients into deep-link dial strings,
//! [`driver`] runs the send sequence against the web client, and
//! [`dispatch`] fans single and bulk requests out strictly sequentially.

pub mod dispatch;
pub mod driver;
pub mod error;
pub mod outcome;
pub mod phone;

#[cfg(test)]
pub(crate) mod testutil;

pub use {
    dispatch::Dispatcher,
    driver::MessageDriver,
    error::{Error, Result},
    outcome::{BatchResult, RecipientOutcome, RejectReason, SendOutcome},
};
