//! Emitters: render a `ModuleGraph` as hardware description source.
//!
//! Each dialect implements `Emitter`. Emitters are pure: the same graph
//! always yields byte-identical text, and the graph is never mutated, so
//! both dialects can render concurrently.

mod keywords;
mod sv;
mod vhdl;

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;

use crate::error::{GenError, GenResult, Location};
use crate::ir::{naming, Module, ModuleGraph};
use crate::walk::ModelParams;

pub use keywords::{check_identifier, is_reserved};
pub use sv::SvEmitter;
pub use vhdl::VhdlEmitter;

/// Output grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dialect {
    /// Dialect A: VHDL-93.
    Vhdl,
    /// Dialect B: SystemVerilog-2012.
    SystemVerilog,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Vhdl, Dialect::SystemVerilog];

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Vhdl => "vhdl",
            Dialect::SystemVerilog => "sv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Dialect::Vhdl => "vhd",
            Dialect::SystemVerilog => "sv",
        }
    }

    /// Line comment prefix.
    pub fn comment(&self) -> &'static str {
        match self {
            Dialect::Vhdl => "--",
            Dialect::SystemVerilog => "//",
        }
    }

    /// VHDL identifiers are case-insensitive.
    fn fold(&self, name: &str) -> String {
        match self {
            Dialect::Vhdl => name.to_ascii_lowercase(),
            Dialect::SystemVerilog => name.to_string(),
        }
    }

    pub fn parse(name: &str) -> Option<Dialect> {
        match name.to_ascii_lowercase().as_str() {
            "vhdl" | "vhd" => Some(Dialect::Vhdl),
            "sv" | "systemverilog" | "system-verilog" => Some(Dialect::SystemVerilog),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Renders a module graph in one dialect.
pub trait Emitter: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Render every module of `graph`. `params` must be the summary the
    /// graph was built from.
    fn emit(&self, params: &ModelParams, graph: &ModuleGraph) -> GenResult<SourceTree>;
}

/// Create an emitter for the given dialect name.
pub fn create_emitter(name: &str) -> Option<Box<dyn Emitter>> {
    Dialect::parse(name).map(emitter_for)
}

pub fn emitter_for(dialect: Dialect) -> Box<dyn Emitter> {
    match dialect {
        Dialect::Vhdl => Box::new(VhdlEmitter::new()),
        Dialect::SystemVerilog => Box::new(SvEmitter::new()),
    }
}

/// Run several emitters concurrently over the same graph.
///
/// Trees come back in the order of `dialects`; on failure the error of
/// the first failing dialect in that order is returned.
pub fn emit_all(
    dialects: &[Dialect],
    params: &ModelParams,
    graph: &ModuleGraph,
) -> GenResult<Vec<SourceTree>> {
    let results: Vec<GenResult<SourceTree>> = dialects
        .par_iter()
        .map(|d| emitter_for(*d).emit(params, graph))
        .collect();
    results.into_iter().collect()
}

/// One generated file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub contents: String,
}

/// All files generated for one dialect, in compile order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceTree {
    pub dialect: Dialect,
    pub model_name: String,
    pub files: Vec<SourceFile>,
}

impl SourceTree {
    pub fn file(&self, name: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn manifest_name(model_name: &str) -> String {
        format!("{}.manifest", model_name)
    }

    /// BLAKE3 digest over every file name and its contents.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for file in &self.files {
            hasher.update(file.name.as_bytes());
            hasher.update(&[0]);
            hasher.update(&(file.contents.len() as u64).to_le_bytes());
            hasher.update(file.contents.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Assemble a tree from rendered module files and append its manifest.
    fn assemble(dialect: Dialect, graph: &ModuleGraph, files: Vec<SourceFile>) -> Self {
        let mut lines = vec![
            format!("{} lutgen manifest", dialect.comment()),
            format!("model {}", graph.name()),
            format!("dialect {}", dialect),
            format!("params {}", graph.params()),
        ];
        for file in &files {
            lines.push(format!(
                "{}  {}",
                blake3::hash(file.contents.as_bytes()).to_hex(),
                file.name
            ));
        }
        let mut files = files;
        files.push(SourceFile {
            name: Self::manifest_name(graph.name()),
            contents: lines.join("\n") + "\n",
        });
        SourceTree {
            dialect,
            model_name: graph.name().to_string(),
            files,
        }
    }
}

/// Checks shared by both emitters: the summary matches the graph, and all
/// generated names are legal and collision-free in `dialect`.
fn check_graph(dialect: Dialect, params: &ModelParams, graph: &ModuleGraph) -> GenResult<()> {
    if params != graph.params() {
        return Err(GenError::emission(
            Location::dialect(dialect),
            format!(
                "parameter summary {} does not match module graph {}",
                params,
                graph.params()
            ),
        ));
    }

    check_identifier(dialect, graph.name()).map_err(|message| {
        GenError::emission(
            Location::dialect(dialect),
            format!("model name '{}' {}", graph.name(), message),
        )
    })?;

    for scope in declared_scopes(dialect, graph) {
        let mut seen: BTreeMap<String, &str> = BTreeMap::new();
        for name in &scope.names {
            check_identifier(dialect, name).map_err(|message| {
                GenError::emission(
                    scope.location,
                    format!("generated name '{}' {}", name, message),
                )
            })?;
            if let Some(previous) = seen.insert(dialect.fold(name), name) {
                return Err(GenError::emission(
                    scope.location,
                    format!(
                        "generated names '{}' and '{}' collide in {}",
                        previous, name, scope.owner
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Names declared together in one design unit (or the design library).
struct Scope {
    owner: String,
    location: Location,
    names: Vec<String>,
}

/// Fixed names used inside the argmax comparator of both dialects.
const ARGMAX_LOCALS: [&str; 7] = [
    "NUM_CLASSES",
    "GROUP_SIZE",
    "count",
    "best_count",
    "best",
    "c",
    "k",
];

fn declared_scopes(dialect: Dialect, graph: &ModuleGraph) -> Vec<Scope> {
    let at = Location::dialect(dialect);
    let top = graph.top_name();
    let mut library = Scope {
        owner: "the design library".to_string(),
        location: at,
        names: vec![top.clone()],
    };
    if dialect == Dialect::Vhdl {
        library
            .names
            .extend(["ieee", "std", "work"].iter().map(|n| n.to_string()));
    }
    let mut top_scope = Scope {
        owner: format!("module '{}'", top),
        location: at,
        names: vec![
            top.clone(),
            naming::INPUT_PORT.to_string(),
            naming::OUTPUT_PORT.to_string(),
            naming::ARGMAX_INSTANCE.to_string(),
        ],
    };
    let mut scopes = Vec::new();

    for module in graph.modules() {
        library.names.push(module.name().to_string());
        let mut names = vec![
            module.name().to_string(),
            naming::INPUT_PORT.to_string(),
            naming::OUTPUT_PORT.to_string(),
        ];
        let location = match module {
            Module::Lut(lut) => {
                top_scope.names.push(naming::layer_signal(lut.layer));
                top_scope.names.push(naming::layer_instance(lut.layer));
                for cell in &lut.cells {
                    names.push(cell.select.clone());
                    names.push(cell.output.clone());
                }
                Location::layer(lut.layer).with_dialect(dialect)
            }
            Module::Argmax(_) => {
                names.extend(ARGMAX_LOCALS.iter().map(|n| n.to_string()));
                if dialect == Dialect::Vhdl {
                    names.push("compare".to_string());
                }
                at
            }
        };
        if dialect == Dialect::Vhdl {
            names.push("rtl".to_string());
        }
        scopes.push(Scope {
            owner: format!("module '{}'", module.name()),
            location,
            names,
        });
    }
    if dialect == Dialect::Vhdl {
        top_scope.names.push("rtl".to_string());
    }
    scopes.push(top_scope);
    scopes.push(library);
    scopes
}

/// Comment banner at the top of every generated file.
fn banner(dialect: Dialect, graph: &ModuleGraph, detail: &str) -> Vec<String> {
    let c = dialect.comment();
    vec![
        format!(
            "{} Generated by lutgen from model '{}'. Do not edit.",
            c,
            graph.name()
        ),
        format!("{} {}", c, detail),
        String::new(),
    ]
}

fn layer_detail(lut: &crate::ir::LutModule) -> String {
    format!(
        "Layer {}: {} inputs, {} LUTs with {} inputs each.",
        lut.layer,
        lut.input_width,
        lut.output_width(),
        lut.lut_size
    )
}

fn argmax_detail(spec: &crate::ir::ArgmaxSpec) -> String {
    format!(
        "Argmax over {} classes of {} votes each; ties go to the lowest class.",
        spec.num_classes, spec.group_size
    )
}

fn top_detail(graph: &ModuleGraph) -> String {
    format!(
        "Top level: {} inputs, {} LUT layers, {} classes (one-hot).",
        graph.input_width(),
        graph.params().number_of_layers,
        graph.output_width()
    )
}

fn finish(lines: Vec<String>) -> String {
    lines.join("\n") + "\n"
}
