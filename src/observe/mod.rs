//! Observer mechanism: observation points, tap registrations, statistics
//!
//! An [`ObserverHub`] binds callbacks to [`ObservationPoint`]s of a network;
//! [`crate::nn::Network::forward_observed`] consults the hub at every layer
//! boundary and fires matching callbacks with the intercepted activation.
//! [`compute_statistics`] is the pure per-channel reduction the callbacks
//! typically delegate to.

mod hub;
mod point;
mod stats;

pub use hub::{ObserverHub, TapCallback, TapEvent, TapHandle};
pub use point::{ObservationPoint, TapDirection};
pub use stats::{compute_statistics, ChannelStats};
