//! lutgen: translate a trained lookup-table network into synthesizable
//! VHDL and SystemVerilog.
//!
//! ```text
//! Model ─→ walk ─→ extract ─→ ir::build ─→ emit (vhdl ∥ sv) ─→ output::publish
//! ```

pub mod config;
pub mod diagnostic;
pub mod emit;
pub mod error;
pub mod extract;
pub mod ir;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod walk;

pub use emit::{create_emitter, Dialect, Emitter, SourceFile, SourceTree};
pub use error::{GenError, GenResult, Location};
pub use ir::ModuleGraph;
pub use model::{AggregationLayer, Layer, LutLayer, LutNeuron, Model, TableSpec};
pub use pipeline::{build_graph, generate, generate_to_dir, GenerateOptions, Generated};
pub use walk::{walk, ModelParams};
