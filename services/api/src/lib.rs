//! services/api/src/lib.rs
//!
//! The library half of the `api` service. The `api` and `openapi` binaries and
//! the integration tests are all built on top of it.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
