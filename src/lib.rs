//! Workspace root for the SMS bridge.
//!
//! The deliverables live in the member crates: `sms-core` (shared message
//! model and normalization), `services/agent` (gateway poller),
//! `services/server` (datastore + dashboard API), `services/emulator`
//! (vendor gateway emulator), and `bridge-test-utils` (mock gateway and
//! datastore). This crate only hosts the cross-service integration suites
//! under `tests/integration/`.
