//! Test modules for the werval-runtime crate
//!
//! These suites run whole requests through an assembled application.

mod builtins_tests;
mod chain_tests;
mod support;
