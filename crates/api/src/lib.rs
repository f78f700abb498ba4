//! HTTP API: axum router over the routing engine, plus the process wiring
//! used by the binary.

pub mod app;
