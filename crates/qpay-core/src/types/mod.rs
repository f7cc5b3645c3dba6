//! Core types used across the QPay Kit.

mod amount;
mod payment;

pub use amount::*;
pub use payment::*;
