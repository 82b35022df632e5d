//! Truth-table extraction: one total boolean function and one wiring list
//! per LUT neuron.
//!
//! Rows are enumerated in binary counting order with the first wired input
//! as the most significant bit. Both emitters render rows in this order.

use rayon::prelude::*;

use crate::error::{GenError, GenResult, Location};
use crate::model::{LutNeuron, Model, TableSpec};
use crate::walk::ModelParams;

/// A total mapping from every pattern in `[0, 2^lut_size)` to one bit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TruthTable {
    lut_size: usize,
    words: Vec<u64>,
}

impl TruthTable {
    /// Build a table by evaluating `f` on every pattern.
    pub fn from_fn(lut_size: usize, f: impl Fn(u64) -> bool) -> Self {
        let mut table = Self::zeros(lut_size);
        for pattern in 0..table.len() as u64 {
            if f(pattern) {
                table.set(pattern);
            }
        }
        table
    }

    fn zeros(lut_size: usize) -> Self {
        let rows = 1usize << lut_size;
        Self {
            lut_size,
            words: vec![0; rows.div_ceil(64)],
        }
    }

    fn set(&mut self, pattern: u64) {
        self.words[(pattern / 64) as usize] |= 1 << (pattern % 64);
    }

    pub fn lut_size(&self) -> usize {
        self.lut_size
    }

    /// Number of rows, `2^lut_size`.
    pub fn len(&self) -> usize {
        1 << self.lut_size
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn output(&self, pattern: u64) -> bool {
        debug_assert!((pattern as usize) < self.len());
        (self.words[(pattern / 64) as usize] >> (pattern % 64)) & 1 == 1
    }

    /// Rows in canonical order.
    pub fn rows(&self) -> impl Iterator<Item = (u64, bool)> + '_ {
        (0..self.len() as u64).map(move |p| (p, self.output(p)))
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// The table as a `0`/`1` string, pattern 0 first.
    pub fn to_bit_string(&self) -> String {
        self.rows().map(|(_, b)| if b { '1' } else { '0' }).collect()
    }
}

/// Render `pattern` as `width` binary digits, most-significant first.
pub fn pattern_bits(pattern: u64, width: usize) -> String {
    format!("{:0width$b}", pattern, width = width)
}

/// Ordered source indices feeding one neuron, most-significant first.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Wiring {
    sources: Vec<usize>,
}

impl Wiring {
    pub fn new(sources: Vec<usize>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The table row selected by `inputs`.
    pub fn pattern(&self, inputs: &[bool]) -> u64 {
        self.sources
            .iter()
            .fold(0u64, |acc, &s| (acc << 1) | inputs[s] as u64)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedNeuron {
    pub index: usize,
    pub wiring: Wiring,
    pub table: TruthTable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedLayer {
    pub layer: usize,
    pub input_dim: usize,
    pub lut_size: usize,
    pub neurons: Vec<ExtractedNeuron>,
}

/// Extract every LUT layer of `model`, in layer then neuron order.
///
/// Layers with at least `parallel_threshold` neurons are extracted on the
/// rayon pool. The reported error is always the first failing neuron in
/// canonical order, whichever worker hit it first.
pub fn extract(
    model: &Model,
    params: &ModelParams,
    parallel_threshold: usize,
) -> GenResult<Vec<ExtractedLayer>> {
    let mut layers = Vec::with_capacity(params.number_of_layers);
    for (i, lut) in model.lut_layers() {
        if lut.neurons.len() != lut.n_luts {
            return Err(GenError::structure(
                Location::layer(i),
                format!(
                    "layer declares {} LUTs but lists {} neurons",
                    lut.n_luts,
                    lut.neurons.len()
                ),
            ));
        }

        let results: Vec<GenResult<ExtractedNeuron>> =
            if lut.neurons.len() >= parallel_threshold.max(1) {
                lut.neurons
                    .par_iter()
                    .enumerate()
                    .map(|(j, n)| extract_neuron(i, j, lut.lut_size, n))
                    .collect()
            } else {
                lut.neurons
                    .iter()
                    .enumerate()
                    .map(|(j, n)| extract_neuron(i, j, lut.lut_size, n))
                    .collect()
            };
        let neurons = results.into_iter().collect::<GenResult<Vec<_>>>()?;

        tracing::debug!(
            layer = i,
            neurons = neurons.len(),
            lut_size = lut.lut_size,
            "extracted truth tables"
        );
        layers.push(ExtractedLayer {
            layer: i,
            input_dim: lut.input_dim,
            lut_size: lut.lut_size,
            neurons,
        });
    }
    Ok(layers)
}

fn extract_neuron(
    layer: usize,
    index: usize,
    lut_size: usize,
    neuron: &LutNeuron,
) -> GenResult<ExtractedNeuron> {
    let at = Location::neuron(layer, index);
    if neuron.inputs.len() != lut_size {
        return Err(GenError::structure(
            at,
            format!(
                "neuron wires {} inputs but lut_size is {}",
                neuron.inputs.len(),
                lut_size
            ),
        ));
    }
    let table = resolve_table(at, lut_size, &neuron.table)?;
    Ok(ExtractedNeuron {
        index,
        wiring: Wiring::new(neuron.inputs.clone()),
        table,
    })
}

fn resolve_table(at: Location, lut_size: usize, spec: &TableSpec) -> GenResult<TruthTable> {
    let mut table = TruthTable::zeros(lut_size);
    let rows = table.len();

    match spec {
        TableSpec::Bits(bits) => {
            let len = bits.chars().count();
            if len < rows {
                return Err(GenError::table(
                    at,
                    format!(
                        "{} of {} rows given, pattern {} is missing",
                        len,
                        rows,
                        pattern_bits(len as u64, lut_size)
                    ),
                ));
            }
            if len > rows {
                return Err(GenError::table(
                    at,
                    format!("{} rows given for a {}-row domain", len, rows),
                ));
            }
            for (p, c) in bits.chars().enumerate() {
                match c {
                    '0' => {}
                    '1' => table.set(p as u64),
                    other => {
                        return Err(GenError::table(
                            at,
                            format!(
                                "pattern {} has non-boolean value '{}'",
                                pattern_bits(p as u64, lut_size),
                                other
                            ),
                        ))
                    }
                }
            }
        }
        TableSpec::Rows(entries) => {
            let mut seen = vec![false; rows];
            for &(pattern, bit) in entries {
                if pattern >= rows as u64 {
                    return Err(GenError::table(
                        at,
                        format!("pattern {} outside the {}-row domain", pattern, rows),
                    ));
                }
                let slot = &mut seen[pattern as usize];
                if *slot {
                    return Err(GenError::table(
                        at,
                        format!(
                            "pattern {} appears more than once",
                            pattern_bits(pattern, lut_size)
                        ),
                    ));
                }
                *slot = true;
                match bit {
                    0 => {}
                    1 => table.set(pattern),
                    other => {
                        return Err(GenError::table(
                            at,
                            format!(
                                "pattern {} has non-boolean value {}",
                                pattern_bits(pattern, lut_size),
                                other
                            ),
                        ))
                    }
                }
            }
            if let Some(missing) = seen.iter().position(|s| !s) {
                let count = seen.iter().filter(|s| !**s).count();
                return Err(GenError::table(
                    at,
                    format!(
                        "pattern {} is missing ({} of {} rows undefined)",
                        pattern_bits(missing as u64, lut_size),
                        count,
                        rows
                    ),
                ));
            }
        }
    }
    Ok(table)
}
