//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a subsystem against
//! mock ports.  Everything runs on the host; no GPS feed is needed.

mod checkpoint_tests;
mod mock_ports;
mod registry_tests;
mod worker_tests;
