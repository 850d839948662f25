//! Test suite entry point for `services-common`.
//!
//! Each module below is a separate integration-test binary target in
//! spirit; grouped here so `cargo test -p services-common` runs them
//! together without the per-file binary overhead.

mod error_tests;
mod event_bus_tests;
