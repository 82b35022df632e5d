//! Identifier scheme shared by both emitters.
//!
//! Every name is derived from the model name plus layer and neuron
//! indices, so two different positions can never share a name and a rerun
//! always produces the same names.

/// Input port of every generated module.
pub const INPUT_PORT: &str = "x";
/// Output port of every generated module.
pub const OUTPUT_PORT: &str = "y";
/// Instance label of the comparator inside the top module.
pub const ARGMAX_INSTANCE: &str = "u_argmax";

pub fn top_module(model: &str) -> String {
    model.to_string()
}

pub fn layer_module(model: &str, layer: usize) -> String {
    format!("{}_layer{}", model, layer)
}

pub fn argmax_module(model: &str) -> String {
    format!("{}_argmax", model)
}

/// Bus carrying layer `layer`'s outputs inside the top module.
pub fn layer_signal(layer: usize) -> String {
    format!("layer{}_out", layer)
}

pub fn layer_instance(layer: usize) -> String {
    format!("u_layer{}", layer)
}

/// Concatenated wired inputs of one neuron (its table index).
pub fn neuron_select(layer: usize, neuron: usize) -> String {
    format!("l{}_n{}_sel", layer, neuron)
}

pub fn neuron_output(layer: usize, neuron: usize) -> String {
    format!("l{}_n{}", layer, neuron)
}
