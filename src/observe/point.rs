//! Observation points: which layer, which side

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which activation of a layer an observer intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TapDirection {
    /// The tensor entering the layer
    Input,
    /// The tensor the layer produced
    #[default]
    Output,
}

impl fmt::Display for TapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TapDirection::Input => write!(f, "input"),
            TapDirection::Output => write!(f, "output"),
        }
    }
}

/// A specific layer plus a direction: exactly one point maps to exactly one
/// registered interception.
///
/// Layer addresses use the network's canonical dotted scheme (for example
/// `block0.bn`), which is independent of how the checkpoint was trained;
/// replication-wrapper prefixes are already stripped at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationPoint {
    /// Canonical layer address
    pub layer: String,
    /// Input or output side of the layer
    pub direction: TapDirection,
}

impl ObservationPoint {
    /// Point at the tensor entering `layer`.
    pub fn input(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            direction: TapDirection::Input,
        }
    }

    /// Point at the tensor `layer` produces.
    pub fn output(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            direction: TapDirection::Output,
        }
    }
}

impl fmt::Display for ObservationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of `{}`", self.direction, self.layer)
    }
}
