//! The frozen, discretized model handed over by the training side.
//!
//! The model is read once and never mutated by the pipeline. On disk it is
//! a JSON document; layers are a closed tagged enum so every stage matches
//! on the same two variants.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, GenResult};

/// An ordered sequence of layers plus the top-level input width.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub input_width: usize,
    pub layers: Vec<Layer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    Lut(LutLayer),
    Aggregation(AggregationLayer),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LutLayer {
    pub input_dim: usize,
    pub lut_size: usize,
    pub n_luts: usize,
    pub neurons: Vec<LutNeuron>,
}

/// One trained LUT: the signals it reads and its resolved table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LutNeuron {
    /// Source indices into the previous layer's outputs, most-significant first.
    pub inputs: Vec<usize>,
    pub table: TableSpec,
}

/// A neuron's table as stored by the training side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableSpec {
    /// Character `p` is the output for input pattern `p`.
    Bits(String),
    /// Explicit `(pattern, output)` rows in any order.
    Rows(Vec<(u64, u8)>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregationLayer {
    pub num_classes: usize,
    /// Softmax temperature used in training only; the comparator ignores it.
    #[serde(default = "default_tau")]
    pub tau: f64,
}

fn default_tau() -> f64 {
    1.0
}

impl Model {
    pub fn new(name: impl Into<String>, input_width: usize, layers: Vec<Layer>) -> Self {
        Self {
            name: name.into(),
            input_width,
            layers,
        }
    }

    /// Parse a model from its JSON text.
    pub fn from_json(source: &str) -> GenResult<Model> {
        Ok(serde_json::from_str(source)?)
    }

    /// Read and parse a model file.
    pub fn load(path: &Path) -> GenResult<Model> {
        let source = std::fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
        Model::from_json(&source)
    }

    /// LUT layers in declaration order, paired with their layer index.
    pub fn lut_layers(&self) -> impl Iterator<Item = (usize, &LutLayer)> {
        self.layers.iter().enumerate().filter_map(|(i, l)| match l {
            Layer::Lut(lut) => Some((i, lut)),
            Layer::Aggregation(_) => None,
        })
    }
}

impl LutLayer {
    /// Build a layer whose `n_luts` matches the neuron list.
    pub fn new(input_dim: usize, lut_size: usize, neurons: Vec<LutNeuron>) -> Self {
        Self {
            input_dim,
            lut_size,
            n_luts: neurons.len(),
            neurons,
        }
    }
}

impl LutNeuron {
    pub fn new(inputs: Vec<usize>, bits: &str) -> Self {
        Self {
            inputs,
            table: TableSpec::Bits(bits.to_string()),
        }
    }

    pub fn with_rows(inputs: Vec<usize>, rows: Vec<(u64, u8)>) -> Self {
        Self {
            inputs,
            table: TableSpec::Rows(rows),
        }
    }
}

impl AggregationLayer {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            tau: default_tau(),
        }
    }
}
