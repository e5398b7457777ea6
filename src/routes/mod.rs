//! Router Module Index
//!
//! Splits the routing table by whether the access gate wraps it.

/// Routes mounted outside the access gate (liveness, API docs).
pub mod public;

/// Routes behind the access gate. Handlers read the identity the gate resolved.
pub mod gated;
