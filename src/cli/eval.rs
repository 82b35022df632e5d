use std::path::PathBuf;
use std::process;

use clap::Args;

use lutgen::build_graph;

use super::load_model;

#[derive(Args)]
pub struct EvalArgs {
    /// Model file (JSON)
    pub model: PathBuf,
    /// Input bits, input 0 first (e.g. 0110)
    pub bits: String,
}

pub fn cmd_eval(args: EvalArgs) {
    let loaded = load_model(&args.model);
    let inputs: Vec<bool> = match args
        .bits
        .chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => Err(other),
        })
        .collect()
    {
        Ok(bits) => bits,
        Err(c) => {
            eprintln!("error: input bits may only contain 0 and 1, found '{}'", c);
            process::exit(1);
        }
    };

    let (_, graph) = match build_graph(&loaded.model, &loaded.model.name, usize::MAX) {
        Ok(r) => r,
        Err(e) => loaded.fail(&e),
    };
    let onehot = match graph.evaluate(&inputs) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let rendered: String = onehot.iter().map(|b| if *b { '1' } else { '0' }).collect();
    let class = onehot.iter().position(|b| *b).unwrap_or(0);
    println!("y = {} (class {})", rendered, class);
}
