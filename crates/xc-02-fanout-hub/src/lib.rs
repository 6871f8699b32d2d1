//! # Fan-out Hub Subsystem (xc-02)
//!
//! Distributes newly stored events to live-stream clients.
//!
//! ## Delivery Rules
//!
//! - A subscriber receives every broadcast issued after `register()` returns
//!   and before it unregisters, in issue order, as long as it keeps up.
//! - A subscriber whose buffer is full is dropped on the spot; neither the
//!   broadcaster nor other subscribers wait for it.
//! - Dropping a [`Subscription`] unregisters it.
//!
//! The subscriber set lives inside the [`Hub`] task and is reached only
//! through [`HubHandle`] messages.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod hub;
pub mod subscription;

pub use config::{ConfigError, HubConfig};
pub use hub::{Hub, HubError, HubHandle, HubStats};
pub use subscription::{SubscriberId, Subscription};
