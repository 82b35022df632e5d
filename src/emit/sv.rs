//! SystemVerilog emitter.
//!
//! One module per layer. Each neuron gets a select vector built by
//! concatenation and an `always_comb` case statement with one arm per
//! table row plus a default arm.

use super::{
    argmax_detail, banner, check_graph, finish, layer_detail, top_detail, Dialect, Emitter,
    SourceFile, SourceTree,
};
use crate::error::GenResult;
use crate::extract::pattern_bits;
use crate::ir::{naming, ArgmaxModule, LutCell, LutModule, Module, ModuleGraph};
use crate::walk::ModelParams;

#[derive(Debug, Default)]
pub struct SvEmitter;

impl SvEmitter {
    pub fn new() -> Self {
        Self
    }

    fn file_name(module: &str) -> String {
        format!("{}.{}", module, Dialect::SystemVerilog.extension())
    }

    fn lower_layer(&self, graph: &ModuleGraph, lut: &LutModule) -> SourceFile {
        let mut out = banner(Dialect::SystemVerilog, graph, &layer_detail(lut));
        out.extend(header(&lut.name, lut.input_width, lut.output_width()));
        for cell in &lut.cells {
            out.push(String::new());
            self.lower_cell(lut.lut_size, cell, &mut out);
        }
        out.push(String::new());
        out.push("endmodule".to_string());

        SourceFile {
            name: Self::file_name(&lut.name),
            contents: finish(out),
        }
    }

    fn lower_cell(&self, lut_size: usize, cell: &LutCell, out: &mut Vec<String>) {
        let sources: Vec<String> = cell
            .wiring
            .sources()
            .iter()
            .map(|s| format!("{}[{}]", naming::INPUT_PORT, s))
            .collect();

        out.push(format!("    // neuron {}", cell.index));
        out.push(format!("    logic {} {};", packed(lut_size), cell.select));
        out.push(format!("    logic {};", cell.output));
        out.push(format!(
            "    assign {} = {{{}}};",
            cell.select,
            sources.join(", ")
        ));
        out.push("    always_comb begin".to_string());
        out.push(format!("        case ({})", cell.select));
        for (pattern, bit) in cell.table.rows() {
            out.push(format!(
                "            {}'b{}: {} = 1'b{};",
                lut_size,
                pattern_bits(pattern, lut_size),
                cell.output,
                bit as u8
            ));
        }
        out.push(format!("            default: {} = 1'b0;", cell.output));
        out.push("        endcase".to_string());
        out.push("    end".to_string());
        out.push(format!(
            "    assign {}[{}] = {};",
            naming::OUTPUT_PORT,
            cell.index,
            cell.output
        ));
    }

    fn lower_argmax(&self, graph: &ModuleGraph, argmax: &ArgmaxModule) -> SourceFile {
        let spec = &argmax.spec;
        let w = spec.count_width;
        let mut out = banner(Dialect::SystemVerilog, graph, &argmax_detail(spec));
        out.extend(header(&argmax.name, spec.input_width(), spec.num_classes));
        out.extend([
            String::new(),
            format!("    localparam int NUM_CLASSES = {};", spec.num_classes),
            format!("    localparam int GROUP_SIZE = {};", spec.group_size),
            String::new(),
            format!("    logic {} count;", packed(w)),
            format!("    logic {} best_count;", packed(w)),
            "    int best;".to_string(),
            String::new(),
            "    always_comb begin".to_string(),
            "        best = 0;".to_string(),
            "        best_count = '0;".to_string(),
            "        for (int c = 0; c < NUM_CLASSES; c++) begin".to_string(),
            "            count = '0;".to_string(),
            "            for (int k = 0; k < GROUP_SIZE; k++) begin".to_string(),
            format!(
                "                count = count + {}'(x[c * GROUP_SIZE + k]);",
                w
            ),
            "            end".to_string(),
            "            // strictly greater: the lowest class keeps a tie".to_string(),
            "            if (count > best_count) begin".to_string(),
            "                best = c;".to_string(),
            "                best_count = count;".to_string(),
            "            end".to_string(),
            "        end".to_string(),
            "        y = '0;".to_string(),
            "        y[best] = 1'b1;".to_string(),
            "    end".to_string(),
            String::new(),
            "endmodule".to_string(),
        ]);

        SourceFile {
            name: Self::file_name(&argmax.name),
            contents: finish(out),
        }
    }

    fn lower_top(&self, graph: &ModuleGraph) -> SourceFile {
        let top = graph.top_name();
        let mut out = banner(Dialect::SystemVerilog, graph, &top_detail(graph));
        out.extend(header(&top, graph.input_width(), graph.output_width()));
        out.push(String::new());
        for lut in graph.lut_modules() {
            out.push(format!(
                "    logic {} {};",
                packed(lut.output_width()),
                naming::layer_signal(lut.layer)
            ));
        }

        let mut source = naming::INPUT_PORT.to_string();
        for module in graph.modules() {
            let (label, sink) = match module {
                Module::Lut(lut) => (
                    naming::layer_instance(lut.layer),
                    naming::layer_signal(lut.layer),
                ),
                Module::Argmax(_) => (
                    naming::ARGMAX_INSTANCE.to_string(),
                    naming::OUTPUT_PORT.to_string(),
                ),
            };
            out.extend([
                String::new(),
                format!("    {} {} (", module.name(), label),
                format!("        .{}({}),", naming::INPUT_PORT, source),
                format!("        .{}({})", naming::OUTPUT_PORT, sink),
                "    );".to_string(),
            ]);
            source = sink;
        }
        out.push(String::new());
        out.push("endmodule".to_string());

        SourceFile {
            name: Self::file_name(&top),
            contents: finish(out),
        }
    }
}

impl Emitter for SvEmitter {
    fn dialect(&self) -> Dialect {
        Dialect::SystemVerilog
    }

    fn emit(&self, params: &ModelParams, graph: &ModuleGraph) -> GenResult<SourceTree> {
        check_graph(Dialect::SystemVerilog, params, graph)?;
        let mut files = Vec::with_capacity(graph.modules().len() + 2);
        for module in graph.modules() {
            files.push(match module {
                Module::Lut(lut) => self.lower_layer(graph, lut),
                Module::Argmax(argmax) => self.lower_argmax(graph, argmax),
            });
        }
        files.push(self.lower_top(graph));
        Ok(SourceTree::assemble(Dialect::SystemVerilog, graph, files))
    }
}

/// Packed dimension for a `width`-bit vector.
fn packed(width: usize) -> String {
    format!("[{}:0]", width - 1)
}

fn header(name: &str, inputs: usize, outputs: usize) -> Vec<String> {
    vec![
        format!("module {} (", name),
        format!(
            "    input  logic {} {},",
            packed(inputs),
            naming::INPUT_PORT
        ),
        format!(
            "    output logic {} {}",
            packed(outputs),
            naming::OUTPUT_PORT
        ),
        ");".to_string(),
    ]
}
