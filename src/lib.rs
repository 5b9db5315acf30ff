//! UpFlow auth and multi-tenant access-control service.
//!
//! The crate is split into three layers:
//!
//! - [`auth`]: pure credential/token primitives (password hashing, the signed
//!   session token codec, the reset-token scheme) plus the startup
//!   configuration they share.
//! - [`access`]: the project access verifier, the single authorization
//!   decision point for every tenant-scoped operation.
//! - [`upflow`]: the HTTP surface (axum handlers, storage, server wiring).

pub mod access;
pub mod auth;
pub mod cli;
pub mod upflow;
