//! The watch pipeline.
//!
//! A [`Watcher`] runs `source -> decoder -> bundler -> consumer` on its own
//! task:
//! - [`NotificationSource`] opens either a Subscribe stream or a one-shot Get
//! - [`NotificationDecoder`] turns each response into data points
//! - [`DatapointBundler`] holds points back until the path is synced and
//!   groups them into batches
//!
//! [`Monitor`] starts a group of watchers over one shared consumer.

mod bundler;
mod decoder;
mod monitor;
mod source;
mod watcher;

pub use bundler::*;
pub use decoder::*;
pub use monitor::*;
pub use source::*;
pub use watcher::*;
