//! Layer walker: recovers the topology summary of a trained model.
//!
//! The summary is the only data contract between extraction and emission.

use std::fmt;

use crate::error::{GenError, GenResult, Location};
use crate::model::{Layer, Model};

/// Largest LUT arity the pipeline will enumerate (2^16 rows per table).
pub const MAX_LUT_SIZE: usize = 16;

/// Largest signal bus (model input or layer output) the pipeline accepts.
pub const MAX_WIDTH: usize = 1 << 24;

/// Topology summary of a model: LUT layer shapes, input width, class count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelParams {
    /// Number of LUT layers (the terminal aggregation is not counted).
    pub number_of_layers: usize,
    pub num_neurons: Vec<usize>,
    pub lut_sizes: Vec<usize>,
    pub number_of_inputs: usize,
    pub number_of_classes: usize,
}

impl ModelParams {
    /// Declared input width of LUT layer `layer`.
    pub fn input_width(&self, layer: usize) -> usize {
        if layer == 0 {
            self.number_of_inputs
        } else {
            self.num_neurons[layer - 1]
        }
    }

    /// Width of the last LUT layer, i.e. the vote bus feeding the comparator.
    pub fn vote_width(&self) -> usize {
        self.num_neurons.last().copied().unwrap_or(0)
    }

    /// Votes per class.
    pub fn group_size(&self) -> usize {
        self.vote_width() / self.number_of_classes.max(1)
    }
}

impl fmt::Display for ModelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {:?}, {:?}, {}, {})",
            self.number_of_layers,
            self.num_neurons,
            self.lut_sizes,
            self.number_of_inputs,
            self.number_of_classes
        )
    }
}

/// Walk the layer sequence and check that shapes chain together.
pub fn walk(model: &Model) -> GenResult<ModelParams> {
    let Some((last, body)) = model.layers.split_last() else {
        return Err(GenError::structure(Location::model(), "model has no layers"));
    };
    let last_index = body.len();

    let number_of_classes = match last {
        Layer::Aggregation(agg) => agg.num_classes,
        Layer::Lut(_) => {
            return Err(GenError::structure(
                Location::layer(last_index),
                "last layer must be an aggregation layer",
            ))
        }
    };
    if number_of_classes == 0 {
        return Err(GenError::structure(
            Location::layer(last_index),
            "aggregation layer declares zero classes",
        ));
    }
    if body.is_empty() {
        return Err(GenError::structure(
            Location::layer(last_index),
            "aggregation layer has no LUT layer to read votes from",
        ));
    }

    if model.input_width > MAX_WIDTH {
        return Err(GenError::structure(
            Location::model(),
            format!(
                "input width {} exceeds the limit of {}",
                model.input_width, MAX_WIDTH
            ),
        ));
    }

    let mut num_neurons = Vec::with_capacity(body.len());
    let mut lut_sizes = Vec::with_capacity(body.len());
    let mut expected_input = model.input_width;

    for (i, layer) in body.iter().enumerate() {
        let lut = match layer {
            Layer::Lut(lut) => lut,
            Layer::Aggregation(_) => {
                return Err(GenError::structure(
                    Location::layer(i),
                    "aggregation layer is only allowed as the last layer",
                ))
            }
        };
        if lut.input_dim != expected_input {
            let source = if i == 0 {
                "model input width".to_string()
            } else {
                format!("output width of layer {}", i - 1)
            };
            return Err(GenError::structure(
                Location::layer(i),
                format!(
                    "input_dim {} does not match {} ({})",
                    lut.input_dim, source, expected_input
                ),
            ));
        }
        if lut.lut_size == 0 || lut.lut_size > MAX_LUT_SIZE {
            return Err(GenError::structure(
                Location::layer(i),
                format!("lut_size {} outside 1..={}", lut.lut_size, MAX_LUT_SIZE),
            ));
        }
        if lut.n_luts == 0 || lut.n_luts > MAX_WIDTH {
            return Err(GenError::structure(
                Location::layer(i),
                format!("n_luts {} outside 1..={}", lut.n_luts, MAX_WIDTH),
            ));
        }
        num_neurons.push(lut.n_luts);
        lut_sizes.push(lut.lut_size);
        expected_input = lut.n_luts;
    }

    if expected_input % number_of_classes != 0 {
        return Err(GenError::structure(
            Location::layer(last_index),
            format!(
                "{} votes cannot be split evenly across {} classes",
                expected_input, number_of_classes
            ),
        ));
    }

    let params = ModelParams {
        number_of_layers: body.len(),
        num_neurons,
        lut_sizes,
        number_of_inputs: model.input_width,
        number_of_classes,
    };
    tracing::debug!(params = %params, "walked model '{}'", model.name);
    Ok(params)
}
