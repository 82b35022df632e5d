//! Assembles extracted layers and the aggregation head into a `ModuleGraph`.

use crate::error::{GenError, GenResult, Location};
use crate::extract::ExtractedLayer;
use crate::model::AggregationLayer;
use crate::walk::ModelParams;

use super::naming;
use super::{ArgmaxModule, ArgmaxSpec, LutCell, LutModule, Module, ModuleGraph};

/// Build the module graph and check that every wire resolves.
///
/// Layer `i` may only read `[0, input_width(i))`: the top-level input bus
/// for the first layer, the previous module's outputs otherwise.
pub fn build(
    name: &str,
    params: &ModelParams,
    layers: Vec<ExtractedLayer>,
    aggregation: &AggregationLayer,
) -> GenResult<ModuleGraph> {
    if layers.len() != params.number_of_layers {
        return Err(GenError::structure(
            Location::model(),
            format!(
                "{} extracted layers for {} declared LUT layers",
                layers.len(),
                params.number_of_layers
            ),
        ));
    }

    let mut modules = Vec::with_capacity(layers.len() + 1);
    for (i, layer) in layers.into_iter().enumerate() {
        modules.push(Module::Lut(build_layer(name, params, i, layer)?));
    }

    let spec = ArgmaxSpec::translate(aggregation, params);
    let last_width = params.vote_width();
    if spec.input_width() != last_width {
        return Err(GenError::wiring(
            Location::layer(params.number_of_layers),
            format!(
                "comparator reads {} votes but the last layer drives {}",
                spec.input_width(),
                last_width
            ),
        ));
    }
    if spec.num_classes != params.number_of_classes {
        return Err(GenError::wiring(
            Location::layer(params.number_of_layers),
            format!(
                "comparator drives {} outputs, expected {}",
                spec.num_classes, params.number_of_classes
            ),
        ));
    }
    modules.push(Module::Argmax(ArgmaxModule {
        name: naming::argmax_module(name),
        spec,
    }));

    let graph = ModuleGraph {
        name: name.to_string(),
        params: params.clone(),
        modules,
    };

    let unused = graph.unused_inputs();
    if !unused.is_empty() {
        tracing::debug!(
            count = unused.len(),
            "top-level inputs not read by any first-layer neuron: {:?}",
            unused
        );
    }
    tracing::debug!(modules = graph.modules().len(), "built module graph");
    Ok(graph)
}

fn build_layer(
    name: &str,
    params: &ModelParams,
    i: usize,
    layer: ExtractedLayer,
) -> GenResult<LutModule> {
    let width = params.input_width(i);
    let source_name = if i == 0 {
        "top-level input".to_string()
    } else {
        format!("layer {} output", i - 1)
    };

    if layer.input_dim != width {
        return Err(GenError::wiring(
            Location::layer(i),
            format!(
                "layer reads {} signals but {} is {} wide",
                layer.input_dim, source_name, width
            ),
        ));
    }
    if layer.lut_size != params.lut_sizes[i] || layer.neurons.len() != params.num_neurons[i] {
        return Err(GenError::structure(
            Location::layer(i),
            format!(
                "extracted shape {}x{} differs from summary {}x{}",
                layer.neurons.len(),
                layer.lut_size,
                params.num_neurons[i],
                params.lut_sizes[i]
            ),
        ));
    }

    let mut cells = Vec::with_capacity(layer.neurons.len());
    for (position, neuron) in layer.neurons.into_iter().enumerate() {
        let at = Location::neuron(i, position);
        if neuron.index != position {
            return Err(GenError::wiring(
                at,
                format!("neuron {} listed at position {}", neuron.index, position),
            ));
        }
        if let Some((k, &s)) = neuron
            .wiring
            .sources()
            .iter()
            .enumerate()
            .find(|(_, &s)| s >= width)
        {
            return Err(GenError::wiring(
                at,
                format!(
                    "input {} refers to signal {}, but {} has only {} signals",
                    k, s, source_name, width
                ),
            ));
        }
        cells.push(LutCell {
            index: position,
            select: naming::neuron_select(i, position),
            output: naming::neuron_output(i, position),
            wiring: neuron.wiring,
            table: neuron.table,
        });
    }

    Ok(LutModule {
        layer: i,
        name: naming::layer_module(name, i),
        input_width: width,
        lut_size: layer.lut_size,
        cells,
    })
}
