use std::path::PathBuf;

use clap::Args;

use lutgen::build_graph;

use super::load_model;

#[derive(Args)]
pub struct InspectArgs {
    /// Model file (JSON)
    pub model: PathBuf,
}

pub fn cmd_inspect(args: InspectArgs) {
    let loaded = load_model(&args.model);
    let (params, graph) = match build_graph(&loaded.model, &loaded.model.name, usize::MAX) {
        Ok(r) => r,
        Err(e) => loaded.fail(&e),
    };

    println!("model:             {}", graph.name());
    println!("parameters:        {}", params);
    println!("number_of_layers:  {}", params.number_of_layers);
    println!("num_neurons:       {:?}", params.num_neurons);
    println!("lut_sizes:         {:?}", params.lut_sizes);
    println!("number_of_inputs:  {}", params.number_of_inputs);
    println!("number_of_classes: {}", params.number_of_classes);
    println!("votes per class:   {}", params.group_size());

    let unused = graph.unused_inputs();
    if !unused.is_empty() {
        println!("unused inputs:     {} of {}", unused.len(), params.number_of_inputs);
    }
}
