//! QPay gateway kit.
//!
//! Translates a normalized payment vocabulary (authorize, capture, refund,
//! void, client tokens, stored sources) into calls against the QPay merchant
//! web service, and wraps any [`concepts::Gateway`] into a host plugin chain.

pub mod concepts;
pub mod mock;
pub mod plugin;
pub mod transport;

#[cfg(feature = "remote-client")]
pub mod gateway_client;

pub use qpay_core::{config, errors, types};
