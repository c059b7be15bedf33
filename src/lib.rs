//! Sondear: activation probing for trained networks
//!
//! Sondear attaches non-intrusive observers ("taps") to chosen layers of an
//! evaluation-mode network, captures the input or output activation flowing
//! through each instrumented layer during a single forward evaluation, and
//! reports per-channel summary statistics (mean, variance, max, min).
//!
//! The library does no training, no backpropagation, and no gradient
//! bookkeeping: the network is read-only during inspection, and the whole
//! pipeline (attach, evaluate once, detach) completes in one bounded,
//! single-threaded call.
//!
//! ## Example
//!
//! ```ignore
//! use sondear::{compute_statistics, Device, Network, NetworkConfig};
//! use sondear::{ObservationPoint, ObserverHub};
//!
//! let network = Network::new(&NetworkConfig::tiny(), Device::Cpu)?;
//! let hub = ObserverHub::new();
//!
//! let mut handle = hub.attach(
//!     &network,
//!     ObservationPoint::output("block0.bn"),
//!     Box::new(|event| {
//!         for stats in compute_statistics(event.activation, 1)? {
//!             println!("{stats:?}");
//!         }
//!         Ok(())
//!     }),
//! )?;
//!
//! network.forward_observed(&batch, &hub)?;
//! handle.detach();
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod io;
pub mod nn;
pub mod observe;
pub mod report;

use thiserror::Error;

/// Crate-level error type
///
/// Every failure surfaces immediately to the caller; inspection is a
/// one-shot diagnostic run and there is no retry layer anywhere.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad run configuration: wrong checkpoint contents, device mismatch,
    /// inconsistent network description
    #[error("Configuration error: {0}")]
    Config(String),

    /// An observation point addressed a layer the network does not have
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// The channel-axis assumption was violated (bad rank, out-of-bounds
    /// axis, or an empty value population)
    #[error("Invalid activation shape: {0}")]
    InvalidShape(String),

    /// Serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for sondear operations
pub type Result<T> = std::result::Result<T, Error>;

pub use data::{load_batch, Batch, DataConfig};
pub use io::{load_checkpoint, save_checkpoint, CheckpointState};
pub use nn::{Device, Layer, Network, NetworkConfig};
pub use observe::{
    compute_statistics, ChannelStats, ObservationPoint, ObserverHub, TapDirection, TapEvent,
    TapHandle,
};
pub use report::ProbeReport;
