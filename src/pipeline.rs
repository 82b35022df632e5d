//! The generation run: walk → extract → build → emit → publish.
//!
//! Any stage failure aborts the whole run before anything is written.

use std::path::PathBuf;

use crate::emit::{emit_all, Dialect, SourceTree};
use crate::error::{GenError, GenResult, Location};
use crate::extract::extract;
use crate::ir::{build, ModuleGraph};
use crate::model::{Layer, Model};
use crate::output::{publish, OutputLayout};
use crate::walk::{walk, ModelParams};

/// Knobs for one generation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Overrides the model's own name in every generated identifier.
    pub name: Option<String>,
    pub dialects: Vec<Dialect>,
    pub parallel_threshold: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            name: None,
            dialects: Dialect::ALL.to_vec(),
            parallel_threshold: 256,
        }
    }
}

/// Everything a run produced, before anything touches the filesystem.
#[derive(Clone, Debug)]
pub struct Generated {
    pub params: ModelParams,
    pub graph: ModuleGraph,
    pub trees: Vec<SourceTree>,
}

impl Generated {
    pub fn tree(&self, dialect: Dialect) -> Option<&SourceTree> {
        self.trees.iter().find(|t| t.dialect == dialect)
    }
}

/// Walk, extract and build the module graph for `model`.
pub fn build_graph(
    model: &Model,
    name: &str,
    parallel_threshold: usize,
) -> GenResult<(ModelParams, ModuleGraph)> {
    let params = walk(model)?;
    tracing::info!(params = %params, "layer walk complete");

    let layers = extract(model, &params, parallel_threshold)?;
    let aggregation = match model.layers.last() {
        Some(Layer::Aggregation(agg)) => agg,
        _ => {
            return Err(GenError::structure(
                Location::model(),
                "model has no terminal aggregation layer",
            ))
        }
    };

    let graph = build(name, &params, layers, aggregation)?;
    tracing::info!(modules = graph.modules().len(), "module graph built");
    Ok((params, graph))
}

/// Run the pipeline in memory and return every rendered tree.
pub fn generate(model: &Model, options: &GenerateOptions) -> GenResult<Generated> {
    let name = options.name.as_deref().unwrap_or(&model.name);
    let (params, graph) = build_graph(model, name, options.parallel_threshold)?;
    let trees = emit_all(&options.dialects, &params, &graph)?;
    for tree in &trees {
        tracing::info!(
            dialect = %tree.dialect,
            files = tree.files.len(),
            digest = %tree.digest(),
            "emitted"
        );
    }
    Ok(Generated {
        params,
        graph,
        trees,
    })
}

/// Run the pipeline and publish the trees under `layout`.
pub fn generate_to_dir(
    model: &Model,
    options: &GenerateOptions,
    layout: &OutputLayout,
) -> GenResult<(Generated, Vec<PathBuf>)> {
    let generated = generate(model, options)?;
    let dirs = publish(layout, &generated.trees)?;
    Ok((generated, dirs))
}
