//! Utilities for integration tests.
//!
//! The `test-util` crate provides a loopback capture receiver that speaks the
//! event frame protocol on both TCP and UDP, plus helpers for addresses that
//! refuse connections. It is used by integration tests in the main crate.

mod capture;

pub use capture::{CaptureServer, CapturedFrame, Ingress, refused_addr};
