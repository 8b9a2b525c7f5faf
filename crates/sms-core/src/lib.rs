//! sms-core: Domain types and pure logic for the SMS gateway bridge.
//!
//! This crate holds everything that does not touch the network or a
//! database: the canonical message model, normalization of the vendor
//! gateway's firmware-dependent JSON shapes, synthesized dedup ids,
//! bulk-import parsing, health classification, and dashboard analytics.
//! It is shared by the agent, the server, and the test harnesses.

pub mod analytics;
pub mod health;
pub mod import;
pub mod message;
pub mod normalize;

pub use message::{MessageStatus, SmsMessage};
pub use normalize::normalize_message;
