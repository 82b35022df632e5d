//! A small reader for the generated sources. It understands only the
//! subset of each dialect the emitters produce, and evaluates the netlist
//! it reads so tests can compare both dialects against the module graph.

#![allow(dead_code)]

mod comparator;

use std::collections::{BTreeMap, HashMap};

pub use comparator::Stmt;

use lutgen::{Dialect, SourceTree};

/// One neuron as read back from source.
#[derive(Debug, Default)]
pub struct Cell {
    pub select: String,
    pub sources: Vec<usize>,
    pub rows: HashMap<String, bool>,
    pub default: Option<bool>,
}

#[derive(Debug)]
pub enum Unit {
    Lut {
        /// Output bit index → cell output signal.
        outputs: BTreeMap<usize, String>,
        /// Cell output signal → cell.
        cells: HashMap<String, Cell>,
    },
    Argmax {
        num_classes: usize,
        group_size: usize,
        /// The comparator statements exactly as emitted.
        body: Vec<Stmt>,
    },
    Top {
        instances: Vec<Instance>,
    },
}

#[derive(Debug, Default)]
pub struct Instance {
    pub label: String,
    pub module: String,
    pub source: String,
    pub sink: String,
}

#[derive(Debug)]
pub struct Netlist {
    pub units: HashMap<String, Unit>,
    pub top: String,
}

impl Netlist {
    pub fn read(tree: &SourceTree) -> Netlist {
        let sources: Vec<(String, String)> = tree
            .files
            .iter()
            .filter(|f| !f.name.ends_with(".manifest"))
            .map(|f| (f.name.clone(), f.contents.clone()))
            .collect();
        Netlist::read_files(tree.dialect, &sources)
    }

    pub fn read_files(dialect: Dialect, files: &[(String, String)]) -> Netlist {
        let mut units = HashMap::new();
        let mut top = None;
        for (file, contents) in files {
            let (name, unit) = match dialect {
                Dialect::Vhdl => read_vhdl(contents),
                Dialect::SystemVerilog => read_sv(contents),
            };
            assert!(
                file.starts_with(&name),
                "file {} declares unit {}",
                file,
                name
            );
            if matches!(unit, Unit::Top { .. }) {
                assert!(top.is_none(), "two top-level units");
                top = Some(name.clone());
            }
            units.insert(name, unit);
        }
        Netlist {
            units,
            top: top.expect("no top-level unit"),
        }
    }

    /// Evaluate the top unit on one input vector.
    pub fn evaluate(&self, inputs: &[bool]) -> Vec<bool> {
        let Some(Unit::Top { instances }) = self.units.get(&self.top) else {
            unreachable!()
        };
        let mut signals: HashMap<&str, Vec<bool>> = HashMap::new();
        signals.insert("x", inputs.to_vec());
        for inst in instances {
            let input = signals
                .get(inst.source.as_str())
                .unwrap_or_else(|| panic!("{} reads undriven {}", inst.label, inst.source))
                .clone();
            let unit = self
                .units
                .get(&inst.module)
                .unwrap_or_else(|| panic!("{} instantiates unknown {}", inst.label, inst.module));
            signals.insert(inst.sink.as_str(), evaluate_unit(unit, &input));
        }
        signals.remove("y").expect("y is never driven")
    }

    pub fn lut_cells(&self) -> impl Iterator<Item = &Cell> {
        self.units.values().flat_map(|u| match u {
            Unit::Lut { cells, .. } => cells.values().collect::<Vec<_>>(),
            _ => Vec::new(),
        })
    }
}

fn evaluate_unit(unit: &Unit, input: &[bool]) -> Vec<bool> {
    match unit {
        Unit::Lut { outputs, cells } => outputs
            .values()
            .map(|out| {
                let cell = &cells[out];
                let pattern: String = cell
                    .sources
                    .iter()
                    .map(|&s| if input[s] { '1' } else { '0' })
                    .collect();
                cell.rows
                    .get(&pattern)
                    .copied()
                    .or(cell.default)
                    .expect("pattern matched no row")
            })
            .collect(),
        Unit::Argmax {
            num_classes,
            group_size,
            body,
        } => comparator::run(body, *num_classes, *group_size, input),
        Unit::Top { .. } => panic!("nested top-level unit"),
    }
}

/// Parse `prefix(N)suffix`-style indices such as `x[3]` or `x(3)`.
fn index_in(text: &str, open: char, close: char) -> Option<usize> {
    let start = text.find(open)? + 1;
    let end = text[start..].find(close)? + start;
    text[start..end].trim().parse().ok()
}

fn bit(text: &str) -> bool {
    match text.trim() {
        "1'b1" | "'1'" => true,
        "1'b0" | "'0'" => false,
        other => panic!("not a bit literal: {}", other),
    }
}

struct Reader {
    name: Option<String>,
    outputs: BTreeMap<usize, String>,
    cells: HashMap<String, Cell>,
    selects: HashMap<String, Vec<usize>>,
    /// Output signal of the table being read.
    current: Option<String>,
    num_classes: Option<usize>,
    group_size: Option<usize>,
    instances: Vec<Instance>,
}

impl Reader {
    fn new() -> Self {
        Reader {
            name: None,
            outputs: BTreeMap::new(),
            cells: HashMap::new(),
            selects: HashMap::new(),
            current: None,
            num_classes: None,
            group_size: None,
            instances: Vec::new(),
        }
    }

    fn open_table(&mut self, select: &str, output: &str) {
        let cell = self.cells.entry(output.to_string()).or_default();
        cell.select = select.to_string();
        self.current = Some(output.to_string());
    }

    fn row(&mut self, pattern: &str, value: bool) {
        let out = self.current.clone().expect("row outside a table");
        let cell = self.cells.get_mut(&out).expect("open table");
        let previous = cell.rows.insert(pattern.to_string(), value);
        assert!(previous.is_none(), "{} lists pattern {} twice", out, pattern);
    }

    fn default(&mut self, value: bool) {
        let out = self.current.take().expect("default outside a table");
        self.cells.get_mut(&out).expect("open table").default = Some(value);
    }

    fn finish(mut self, dialect: Dialect, contents: &str) -> (String, Unit) {
        let name = self.name.expect("no unit declared");
        if !self.instances.is_empty() {
            return (
                name,
                Unit::Top {
                    instances: self.instances,
                },
            );
        }
        if let (Some(num_classes), Some(group_size)) = (self.num_classes, self.group_size) {
            return (
                name,
                Unit::Argmax {
                    num_classes,
                    group_size,
                    body: comparator::read(dialect, contents),
                },
            );
        }
        for cell in self.cells.values_mut() {
            cell.sources = self
                .selects
                .remove(&cell.select)
                .unwrap_or_else(|| panic!("select {} is never assigned", cell.select));
        }
        assert!(self.selects.is_empty(), "unused selects: {:?}", self.selects);
        (
            name,
            Unit::Lut {
                outputs: self.outputs,
                cells: self.cells,
            },
        )
    }
}

// ── SystemVerilog ──

fn read_sv(contents: &str) -> (String, Unit) {
    let mut r = Reader::new();
    let mut instance: Option<Instance> = None;
    for line in contents.lines() {
        let t = line.trim();
        if t.starts_with("//") || t.is_empty() {
            continue;
        }
        if let Some(rest) = t.strip_prefix("module ") {
            r.name = Some(rest.trim_end_matches(" (").to_string());
        } else if let Some(rest) = t.strip_prefix("assign ") {
            let (lhs, rhs) = rest.trim_end_matches(';').split_once(" = ").unwrap();
            if lhs.starts_with("y[") {
                r.outputs
                    .insert(index_in(lhs, '[', ']').unwrap(), rhs.to_string());
            } else {
                let sources = rhs
                    .trim_start_matches('{')
                    .trim_end_matches('}')
                    .split(", ")
                    .map(|s| index_in(s, '[', ']').unwrap())
                    .collect();
                r.selects.insert(lhs.to_string(), sources);
            }
        } else if let Some(rest) = t.strip_prefix("case (") {
            let select = rest.trim_end_matches(')');
            let output = select.trim_end_matches("_sel");
            r.open_table(select, output);
        } else if let Some(rest) = t.strip_prefix("default: ") {
            let (_, value) = rest.trim_end_matches(';').split_once(" = ").unwrap();
            r.default(bit(value));
        } else if t.starts_with(|c: char| c.is_ascii_digit()) && t.contains("'b") {
            let (pattern, assign) = t.split_once(": ").unwrap();
            let (_, bits) = pattern.split_once("'b").unwrap();
            let (_, value) = assign.trim_end_matches(';').split_once(" = ").unwrap();
            r.row(bits, bit(value));
        } else if let Some(rest) = t.strip_prefix("localparam int ") {
            let (name, value) = rest.trim_end_matches(';').split_once(" = ").unwrap();
            let value = value.parse().unwrap();
            match name {
                "NUM_CLASSES" => r.num_classes = Some(value),
                "GROUP_SIZE" => r.group_size = Some(value),
                other => panic!("unexpected localparam {}", other),
            }
        } else if let Some(rest) = t.strip_prefix(".x(") {
            instance.as_mut().unwrap().source = rest.trim_end_matches("),").to_string();
        } else if let Some(rest) = t.strip_prefix(".y(") {
            instance.as_mut().unwrap().sink = rest.trim_end_matches(')').to_string();
        } else if t == ");" {
            if let Some(inst) = instance.take() {
                r.instances.push(inst);
            }
        } else if t.ends_with(" (") && t.split_whitespace().count() == 3 {
            let mut parts = t.split_whitespace();
            instance = Some(Instance {
                module: parts.next().unwrap().to_string(),
                label: parts.next().unwrap().to_string(),
                ..Instance::default()
            });
        }
    }
    r.finish(Dialect::SystemVerilog, contents)
}

// ── VHDL ──

fn read_vhdl(contents: &str) -> (String, Unit) {
    let mut r = Reader::new();
    let mut instance: Option<Instance> = None;
    for line in contents.lines() {
        let t = line.trim();
        if t.starts_with("--") || t.is_empty() {
            continue;
        }
        if let Some(rest) = t.strip_prefix("entity ") {
            r.name = Some(rest.trim_end_matches(" is").to_string());
        } else if let Some(rest) = t.strip_prefix("with ") {
            let (select, rest) = rest.split_once(" select ").unwrap();
            r.open_table(select, rest.trim_end_matches(" <="));
        } else if let Some(rest) = t.strip_prefix("'0' when others") {
            assert_eq!(rest, ";");
            r.default(false);
        } else if t.starts_with('\'') && t.contains(" when \"") {
            let (value, pattern) = t.split_once(" when ").unwrap();
            r.row(pattern.trim_end_matches(',').trim_matches('"'), bit(value));
        } else if let Some(rest) = t.strip_prefix("constant ") {
            let (name, value) = rest.trim_end_matches(';').split_once(":=").unwrap();
            let name = name.split(':').next().unwrap().trim();
            let value = value.trim().parse().unwrap();
            match name {
                "NUM_CLASSES" => r.num_classes = Some(value),
                "GROUP_SIZE" => r.group_size = Some(value),
                other => panic!("unexpected constant {}", other),
            }
        } else if t.contains(" : entity work.") {
            let (label, module) = t.split_once(" : entity work.").unwrap();
            instance = Some(Instance {
                label: label.to_string(),
                module: module.to_string(),
                ..Instance::default()
            });
        } else if let Some(rest) = t.strip_prefix("x => ") {
            instance.as_mut().unwrap().source = rest.trim_end_matches(',').to_string();
        } else if let Some(rest) = t.strip_prefix("y => ") {
            instance.as_mut().unwrap().sink = rest.to_string();
        } else if t == ");" {
            if let Some(inst) = instance.take() {
                r.instances.push(inst);
            }
        } else if let Some((lhs, rhs)) = t.trim_end_matches(';').split_once(" <= ") {
            if rhs.starts_with("x(") {
                let sources = rhs
                    .split(" & ")
                    .map(|s| index_in(s, '(', ')').unwrap())
                    .collect();
                r.selects
                    .insert(lhs.trim_end_matches("(0)").to_string(), sources);
            } else if lhs.starts_with("y(") {
                if let Some(j) = index_in(lhs, '(', ')') {
                    r.outputs.insert(j, rhs.to_string());
                }
            }
        }
    }
    r.finish(Dialect::Vhdl, contents)
}

// ── Models ──

/// Deterministic pseudo-random bits for building test models.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    pub fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

/// Build a model with random wiring and tables.
pub fn random_model(
    name: &str,
    seed: u64,
    input_width: usize,
    shapes: &[(usize, usize)],
    num_classes: usize,
) -> lutgen::Model {
    use lutgen::{AggregationLayer, Layer, LutLayer, LutNeuron, Model};

    let mut rng = Lcg::new(seed);
    let mut width = input_width;
    let mut layers = Vec::new();
    for &(n_luts, lut_size) in shapes {
        let neurons = (0..n_luts)
            .map(|_| {
                let inputs = (0..lut_size).map(|_| rng.below(width)).collect();
                let bits: String = (0..1usize << lut_size)
                    .map(|_| if rng.next_u64() & 1 == 1 { '1' } else { '0' })
                    .collect();
                LutNeuron::new(inputs, &bits)
            })
            .collect();
        layers.push(Layer::Lut(LutLayer::new(width, lut_size, neurons)));
        width = n_luts;
    }
    layers.push(Layer::Aggregation(AggregationLayer::new(num_classes)));
    Model::new(name, input_width, layers)
}

/// All input vectors of `width` bits, input 0 first.
pub fn all_inputs(width: usize) -> impl Iterator<Item = Vec<bool>> {
    (0..1u64 << width).map(move |v| (0..width).map(|i| (v >> i) & 1 == 1).collect())
}
