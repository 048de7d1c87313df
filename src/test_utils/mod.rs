//! Shared helpers for unit tests: logger setup, data point and notification
//! builders, and scripted gNMI responses.
mod common;
mod notification_builder;

pub use common::*;
pub use notification_builder::*;
