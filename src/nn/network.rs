//! Named layer composition and forward evaluation

use super::{check_device, AvgPool2d, BatchNorm2d, Conv2d, Device, Linear, NetworkConfig};
use crate::io::{CheckpointMetadata, CheckpointState, ParamTensor};
use crate::observe::{ObservationPoint, ObserverHub};
use crate::{Error, Result};
use ndarray::ArrayD;
use std::collections::BTreeMap;
use std::collections::HashSet;

/// One computation step of a network.
#[derive(Debug)]
pub enum Layer {
    Conv2d(Conv2d),
    BatchNorm2d(BatchNorm2d),
    Relu,
    AvgPool2d(AvgPool2d),
    Flatten,
    Linear(Linear),
    /// Passes its input through unchanged. Useful as a placeholder and as a
    /// stub layer whose observed output is a known array.
    Identity,
}

impl Layer {
    /// Evaluate this layer on `input`.
    pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        match self {
            Layer::Conv2d(conv) => conv.forward(input),
            Layer::BatchNorm2d(bn) => bn.forward(input),
            Layer::Relu => Ok(input.mapv(|v| v.max(0.0))),
            Layer::AvgPool2d(pool) => pool.forward(input),
            Layer::Flatten => flatten(input),
            Layer::Linear(linear) => linear.forward(input),
            Layer::Identity => Ok(input.clone()),
        }
    }

    /// Short kind tag for display.
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Conv2d(_) => "conv2d",
            Layer::BatchNorm2d(_) => "batchnorm2d",
            Layer::Relu => "relu",
            Layer::AvgPool2d(_) => "avgpool2d",
            Layer::Flatten => "flatten",
            Layer::Linear(_) => "linear",
            Layer::Identity => "identity",
        }
    }

    fn params(&self, prefix: &str) -> Vec<(String, ParamTensor)> {
        match self {
            Layer::Conv2d(conv) => conv.params(prefix),
            Layer::BatchNorm2d(bn) => bn.params(prefix),
            Layer::Linear(linear) => linear.params(prefix),
            _ => Vec::new(),
        }
    }
}

/// Collapse all non-batch axes into one: `[n, ...]` → `[n, prod(...)]`.
fn flatten(input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
    if input.ndim() < 2 {
        return Err(Error::InvalidShape(format!(
            "flatten expects at least 2 axes, got {}",
            input.ndim()
        )));
    }
    let batch = input.shape()[0];
    let rest: usize = input.shape()[1..].iter().product();
    let values: Vec<f32> = input.iter().copied().collect();
    ndarray::Array2::from_shape_vec((batch, rest), values)
        .map(ndarray::Array2::into_dyn)
        .map_err(|e| Error::InvalidShape(e.to_string()))
}

/// A layer bound to its canonical dotted address.
#[derive(Debug)]
pub struct NamedLayer {
    name: String,
    layer: Layer,
}

impl NamedLayer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }
}

/// An ordered composition of named layers in evaluation mode.
///
/// The network is read-only during inspection: forward evaluation mutates
/// nothing, accumulates no gradients, and updates no running statistics.
/// Layer addresses (`block0.conv`, `classifier`, ...) are canonical: they do
/// not change with the execution device or with how the checkpoint was
/// trained.
#[derive(Debug)]
pub struct Network {
    layers: Vec<NamedLayer>,
    device: Device,
}

impl Network {
    /// Build a network from `config` with deterministic initialization.
    pub fn new(config: &NetworkConfig, device: Device) -> Result<Self> {
        Self::build(config, device, None)
    }

    /// Build a network from `config`, loading every parameter from a
    /// checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the checkpoint is missing a parameter
    /// for a configured layer, or when a stored parameter's shape does not
    /// match the configuration.
    pub fn from_checkpoint(
        config: &NetworkConfig,
        state: &CheckpointState,
        device: Device,
    ) -> Result<Self> {
        Self::build(config, device, Some(state))
    }

    /// Assemble a network directly from named layers. Names must be unique.
    pub fn from_layers(layers: Vec<(String, Layer)>, device: Device) -> Result<Self> {
        check_device(device)?;
        let mut seen = HashSet::new();
        for (name, _) in &layers {
            if !seen.insert(name.clone()) {
                return Err(Error::Config(format!("duplicate layer name `{name}`")));
            }
        }
        Ok(Self {
            layers: layers
                .into_iter()
                .map(|(name, layer)| NamedLayer { name, layer })
                .collect(),
            device,
        })
    }

    fn build(
        config: &NetworkConfig,
        device: Device,
        state: Option<&CheckpointState>,
    ) -> Result<Self> {
        check_device(device)?;
        config.validated()?;

        let mut layers: Vec<(String, Layer)> = Vec::new();
        let mut in_channels = config.in_channels;
        for (i, &channels) in config.block_channels.iter().enumerate() {
            let phase = 0.123 + 0.111 * i as f32;
            let conv_name = format!("block{i}.conv");
            let conv = match state {
                Some(state) => {
                    let conv = Conv2d::from_params(&state.parameters, &conv_name, 1, 1)
                        .ok_or_else(|| missing_params(&conv_name))?;
                    if conv.in_channels() != in_channels
                        || conv.out_channels() != channels
                        || conv.kernel() != 3
                    {
                        return Err(shape_mismatch(&conv_name));
                    }
                    conv
                }
                None => Conv2d::new(in_channels, channels, 3, 1, 1, phase),
            };
            layers.push((conv_name, Layer::Conv2d(conv)));

            let bn_name = format!("block{i}.bn");
            let bn = match state {
                Some(state) => {
                    let bn = BatchNorm2d::from_params(&state.parameters, &bn_name)
                        .ok_or_else(|| missing_params(&bn_name))?;
                    if bn.channels() != channels {
                        return Err(shape_mismatch(&bn_name));
                    }
                    bn
                }
                None => BatchNorm2d::new(channels),
            };
            layers.push((bn_name, Layer::BatchNorm2d(bn)));

            layers.push((format!("block{i}.relu"), Layer::Relu));
            layers.push((format!("block{i}.pool"), Layer::AvgPool2d(AvgPool2d::new(2, 2))));
            in_channels = channels;
        }

        layers.push(("flatten".to_string(), Layer::Flatten));

        let classifier = match state {
            Some(state) => {
                let linear = Linear::from_params(&state.parameters, "classifier")
                    .ok_or_else(|| missing_params("classifier"))?;
                if linear.in_features() != config.classifier_inputs()
                    || linear.out_features() != config.num_classes
                {
                    return Err(shape_mismatch("classifier"));
                }
                linear
            }
            None => Linear::new(config.classifier_inputs(), config.num_classes, 0.987),
        };
        layers.push(("classifier".to_string(), Layer::Linear(classifier)));

        Self::from_layers(layers, device)
    }

    /// The device this network was constructed for.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Canonical addresses of every layer, in evaluation order.
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// The named layers, in evaluation order.
    pub fn layers(&self) -> &[NamedLayer] {
        &self.layers
    }

    /// Resolve a canonical layer address to its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayerNotFound`] when no layer carries `name`.
    pub fn resolve(&self, name: &str) -> Result<usize> {
        self.layers
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| {
                Error::LayerNotFound(format!(
                    "`{name}` (known layers: {})",
                    self.layers
                        .iter()
                        .map(|l| l.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }

    /// One forward evaluation with no observers.
    pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let mut current = input.clone();
        for named in &self.layers {
            current = named.layer.forward(&current)?;
        }
        Ok(current)
    }

    /// One forward evaluation, firing the hub's taps at every layer
    /// boundary.
    ///
    /// For each layer, input taps fire with the tensor entering it and
    /// output taps fire with the tensor it produced, synchronously on the
    /// calling thread. A callback error aborts the evaluation immediately.
    pub fn forward_observed(&self, input: &ArrayD<f32>, hub: &ObserverHub) -> Result<ArrayD<f32>> {
        let mut current = input.clone();
        for named in &self.layers {
            hub.fire(&ObservationPoint::input(&named.name), &current)?;
            let output = named.layer.forward(&current)?;
            hub.fire(&ObservationPoint::output(&named.name), &output)?;
            current = output;
        }
        Ok(current)
    }

    /// Capture every parameter into a checkpoint state under canonical
    /// names.
    pub fn to_checkpoint(&self, name: &str, architecture: &str) -> CheckpointState {
        let mut parameters = BTreeMap::new();
        for named in &self.layers {
            for (key, tensor) in named.layer.params(&named.name) {
                parameters.insert(key, tensor);
            }
        }
        CheckpointState {
            metadata: CheckpointMetadata::stamped(name, architecture),
            parameters,
        }
    }
}

fn missing_params(name: &str) -> Error {
    Error::Config(format!(
        "checkpoint is missing or has ill-shaped parameters for layer `{name}`"
    ))
}

fn shape_mismatch(name: &str) -> Error {
    Error::Config(format!(
        "checkpoint parameters for layer `{name}` do not match the network configuration"
    ))
}
