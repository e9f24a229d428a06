//! AT Driver protocol implementation
//!
//! This module implements the client side of the AT Driver protocol for
//! communicating with assistive technology (screen readers) over a
//! WebSocket.

pub mod client;
pub mod types;

pub use client::{AtDriverClient, Speeches};
pub use types::*;
