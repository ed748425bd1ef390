//! # ringrt-core — shared types for the ringrt io_uring runtime
//!
//! This crate defines the data model that every other `ringrt-*` crate
//! builds on: completion/cookie types, the error taxonomy, the operator
//! -visible log level, and the `Address` value type consumed at the
//! socket facade boundary.
//!
//! Nothing in this crate touches io_uring or an executor directly — it is
//! the "lingua franca" other crates share, the way `ksvc-core` is to the
//! rest of the KSVC stack.

pub mod cookie;
pub mod entry;
pub mod error;
pub mod log;
pub mod address;
pub mod request;
