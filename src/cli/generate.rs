use std::path::PathBuf;
use std::process;

use clap::Args;

use lutgen::config::parse_dialects;
use lutgen::diagnostic::{render_diagnostics, Diagnostic};
use lutgen::{generate, generate_to_dir, Dialect, Generated};

use super::{load_config, load_model, LoadedModel};

#[derive(Args)]
pub struct GenerateArgs {
    /// Model file (JSON) exported after discretization
    pub model: PathBuf,
    /// Name used for generated modules and directories (default: the model's name)
    #[arg(short, long)]
    pub name: Option<String>,
    /// Output root (default: "data", or [output].root in lutgen.toml)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// Dialect to emit: vhdl or sv (repeatable; default: both)
    #[arg(short, long = "dialect", value_name = "DIALECT")]
    pub dialects: Vec<String>,
    /// Configuration file (default: search for lutgen.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Run the whole pipeline but write nothing
    #[arg(long)]
    pub dry_run: bool,
}

pub fn cmd_generate(args: GenerateArgs) {
    let GenerateArgs {
        model,
        name,
        out,
        dialects,
        config,
        dry_run,
    } = args;

    let loaded = load_model(&model);
    let config = load_config(&model, config.as_deref());

    let mut options = match config.options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    options.name = name;
    if !dialects.is_empty() {
        options.dialects = match parse_dialects(&dialects) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        };
    }

    let mut layout = config.layout();
    if let Some(root) = out {
        layout.root = root;
    }

    if dry_run {
        let generated = match generate(&loaded.model, &options) {
            Ok(g) => g,
            Err(e) => loaded.fail(&e),
        };
        warn_unused_inputs(&loaded, &generated);
        for tree in &generated.trees {
            eprintln!(
                "Checked {} ({} files, blake3 {})",
                label(tree.dialect),
                tree.files.len(),
                &tree.digest()[..16]
            );
        }
        return;
    }

    let (generated, dirs) = match generate_to_dir(&loaded.model, &options, &layout) {
        Ok(r) => r,
        Err(e) => loaded.fail(&e),
    };
    warn_unused_inputs(&loaded, &generated);
    for (tree, dir) in generated.trees.iter().zip(&dirs) {
        eprintln!(
            "Generated {} -> {}/ ({} files, blake3 {})",
            label(tree.dialect),
            dir.display(),
            tree.files.len(),
            &tree.digest()[..16]
        );
    }
}

fn warn_unused_inputs(loaded: &LoadedModel, generated: &Generated) {
    let unused = generated.graph.unused_inputs();
    if unused.is_empty() {
        return;
    }
    let shown: Vec<String> = unused.iter().take(8).map(|i| i.to_string()).collect();
    let more = if unused.len() > shown.len() { ", ..." } else { "" };
    let warning = Diagnostic::warning(format!(
        "{} of {} inputs are not read by any first-layer LUT",
        unused.len(),
        generated.params.number_of_inputs
    ))
    .with_note(format!("unused inputs: {}{}", shown.join(", "), more));
    render_diagnostics(&[warning], &loaded.filename(), &loaded.source);
}

fn label(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Vhdl => "VHDL",
        Dialect::SystemVerilog => "SystemVerilog",
    }
}
