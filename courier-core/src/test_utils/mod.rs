//! Test utilities and helpers for Courier
//!
//! Stub collaborators and fixtures shared by unit and integration tests.

pub mod async_helpers;
pub mod fixtures;

pub use async_helpers::*;
pub use fixtures::*;
