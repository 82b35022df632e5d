//! Module graph: the language-neutral description both emitters render.
//!
//! Pipeline:
//! ```text
//! Model → walk → ModelParams ─┐
//!       → extract → layers ───┴→ build → ModuleGraph ─→ VhdlEmitter → SourceTree
//!                                                    └→ SvEmitter   → SourceTree
//! ```
//!
//! A graph is built once from a frozen model and is read-only afterwards.
//! Modules appear in layer order: one module per LUT layer holding all of
//! that layer's neurons, then the argmax comparator.

pub mod argmax;
pub mod builder;
pub mod naming;

use crate::error::{GenError, GenResult, Location};
use crate::extract::{TruthTable, Wiring};
use crate::walk::ModelParams;

pub use argmax::ArgmaxSpec;
pub use builder::build;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleGraph {
    name: String,
    params: ModelParams,
    modules: Vec<Module>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Module {
    Lut(LutModule),
    Argmax(ArgmaxModule),
}

/// All neurons of one LUT layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LutModule {
    pub layer: usize,
    pub name: String,
    pub input_width: usize,
    pub lut_size: usize,
    pub cells: Vec<LutCell>,
}

/// One neuron: its table, the signals it reads, and its internal names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LutCell {
    pub index: usize,
    pub select: String,
    pub output: String,
    pub wiring: Wiring,
    pub table: TruthTable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgmaxModule {
    pub name: String,
    pub spec: ArgmaxSpec,
}

impl Module {
    pub fn name(&self) -> &str {
        match self {
            Module::Lut(m) => &m.name,
            Module::Argmax(m) => &m.name,
        }
    }

    pub fn input_width(&self) -> usize {
        match self {
            Module::Lut(m) => m.input_width,
            Module::Argmax(m) => m.spec.input_width(),
        }
    }

    pub fn output_width(&self) -> usize {
        match self {
            Module::Lut(m) => m.cells.len(),
            Module::Argmax(m) => m.spec.num_classes,
        }
    }
}

impl LutModule {
    pub fn output_width(&self) -> usize {
        self.cells.len()
    }
}

impl ModuleGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn lut_modules(&self) -> impl Iterator<Item = &LutModule> {
        self.modules.iter().filter_map(|m| match m {
            Module::Lut(lut) => Some(lut),
            Module::Argmax(_) => None,
        })
    }

    pub fn top_name(&self) -> String {
        naming::top_module(&self.name)
    }

    pub fn input_width(&self) -> usize {
        self.params.number_of_inputs
    }

    pub fn output_width(&self) -> usize {
        self.params.number_of_classes
    }

    /// Top-level inputs no first-layer neuron reads.
    pub fn unused_inputs(&self) -> Vec<usize> {
        let mut used = vec![false; self.input_width()];
        if let Some(first) = self.lut_modules().next() {
            for cell in &first.cells {
                for &s in cell.wiring.sources() {
                    used[s] = true;
                }
            }
        }
        used.iter()
            .enumerate()
            .filter(|(_, u)| !**u)
            .map(|(i, _)| i)
            .collect()
    }

    /// Reference evaluation of the graph on one input vector.
    /// Returns the one-hot class vector.
    pub fn evaluate(&self, inputs: &[bool]) -> GenResult<Vec<bool>> {
        if inputs.len() != self.input_width() {
            return Err(GenError::structure(
                Location::model(),
                format!(
                    "expected {} input bits, got {}",
                    self.input_width(),
                    inputs.len()
                ),
            ));
        }
        let mut signals = inputs.to_vec();
        for module in &self.modules {
            signals = match module {
                Module::Lut(lut) => lut
                    .cells
                    .iter()
                    .map(|cell| cell.table.output(cell.wiring.pattern(&signals)))
                    .collect(),
                Module::Argmax(a) => a.spec.evaluate(&signals),
            };
        }
        Ok(signals)
    }

    /// Index of the winning class for one input vector.
    pub fn classify(&self, inputs: &[bool]) -> GenResult<usize> {
        let onehot = self.evaluate(inputs)?;
        Ok(onehot.iter().position(|b| *b).unwrap_or(0))
    }
}
