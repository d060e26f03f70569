//! API middleware stack. Only bearer-token auth; rate limiting and replay
//! protection stay out of scope for a localhost-facing backend.

pub mod auth;
