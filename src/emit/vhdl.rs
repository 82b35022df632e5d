//! VHDL-93 emitter.
//!
//! One entity/architecture pair per module. Each neuron becomes a
//! concatenation of its wired inputs followed by a selected signal
//! assignment that lists every table row, then `others`.

use super::{
    argmax_detail, banner, check_graph, finish, layer_detail, top_detail, Dialect, Emitter,
    SourceFile, SourceTree,
};
use crate::error::GenResult;
use crate::extract::pattern_bits;
use crate::ir::{naming, ArgmaxModule, LutCell, LutModule, Module, ModuleGraph};
use crate::walk::ModelParams;

#[derive(Debug, Default)]
pub struct VhdlEmitter;

impl VhdlEmitter {
    pub fn new() -> Self {
        Self
    }

    fn file_name(module: &str) -> String {
        format!("{}.{}", module, Dialect::Vhdl.extension())
    }

    fn lower_layer(&self, graph: &ModuleGraph, lut: &LutModule) -> SourceFile {
        let mut out = banner(Dialect::Vhdl, graph, &layer_detail(lut));
        out.extend(libraries(false));
        out.extend(entity(&lut.name, lut.input_width, lut.output_width()));

        out.push(format!("architecture rtl of {} is", lut.name));
        for cell in &lut.cells {
            out.push(format!(
                "  signal {} : {};",
                cell.select,
                vector(lut.lut_size)
            ));
            out.push(format!("  signal {} : std_logic;", cell.output));
        }
        out.push("begin".to_string());
        for cell in &lut.cells {
            out.push(String::new());
            self.lower_cell(lut.lut_size, cell, &mut out);
        }
        out.push(String::new());
        out.push("end architecture rtl;".to_string());

        SourceFile {
            name: Self::file_name(&lut.name),
            contents: finish(out),
        }
    }

    fn lower_cell(&self, lut_size: usize, cell: &LutCell, out: &mut Vec<String>) {
        out.push(format!("  -- neuron {}", cell.index));
        let sources = cell.wiring.sources();
        if sources.len() == 1 {
            out.push(format!(
                "  {}(0) <= {}({});",
                cell.select,
                naming::INPUT_PORT,
                sources[0]
            ));
        } else {
            let concat: Vec<String> = sources
                .iter()
                .map(|s| format!("{}({})", naming::INPUT_PORT, s))
                .collect();
            out.push(format!("  {} <= {};", cell.select, concat.join(" & ")));
        }

        out.push(format!("  with {} select {} <=", cell.select, cell.output));
        for (pattern, bit) in cell.table.rows() {
            out.push(format!(
                "    {} when \"{}\",",
                std_logic(bit),
                pattern_bits(pattern, lut_size)
            ));
        }
        out.push("    '0' when others;".to_string());
        out.push(format!(
            "  {}({}) <= {};",
            naming::OUTPUT_PORT,
            cell.index,
            cell.output
        ));
    }

    fn lower_argmax(&self, graph: &ModuleGraph, argmax: &ArgmaxModule) -> SourceFile {
        let spec = &argmax.spec;
        let mut out = banner(Dialect::Vhdl, graph, &argmax_detail(spec));
        out.extend(libraries(true));
        out.extend(entity(&argmax.name, spec.input_width(), spec.num_classes));

        let count = format!("unsigned({} downto 0)", spec.count_width - 1);
        out.extend([
            format!("architecture rtl of {} is", argmax.name),
            format!("  constant NUM_CLASSES : natural := {};", spec.num_classes),
            format!("  constant GROUP_SIZE  : natural := {};", spec.group_size),
            "begin".to_string(),
            String::new(),
            "  compare : process (x)".to_string(),
            format!("    variable count      : {};", count),
            format!("    variable best_count : {};", count),
            "    variable best       : natural range 0 to NUM_CLASSES - 1;".to_string(),
            "  begin".to_string(),
            "    best := 0;".to_string(),
            "    best_count := (others => '0');".to_string(),
            "    for c in 0 to NUM_CLASSES - 1 loop".to_string(),
            "      count := (others => '0');".to_string(),
            "      for k in 0 to GROUP_SIZE - 1 loop".to_string(),
            "        if x(c * GROUP_SIZE + k) = '1' then".to_string(),
            "          count := count + 1;".to_string(),
            "        end if;".to_string(),
            "      end loop;".to_string(),
            "      -- strictly greater: the lowest class keeps a tie".to_string(),
            "      if count > best_count then".to_string(),
            "        best := c;".to_string(),
            "        best_count := count;".to_string(),
            "      end if;".to_string(),
            "    end loop;".to_string(),
            "    y <= (others => '0');".to_string(),
            "    y(best) <= '1';".to_string(),
            "  end process compare;".to_string(),
            String::new(),
            "end architecture rtl;".to_string(),
        ]);

        SourceFile {
            name: Self::file_name(&argmax.name),
            contents: finish(out),
        }
    }

    fn lower_top(&self, graph: &ModuleGraph) -> SourceFile {
        let top = graph.top_name();
        let mut out = banner(Dialect::Vhdl, graph, &top_detail(graph));
        out.extend(libraries(false));
        out.extend(entity(&top, graph.input_width(), graph.output_width()));

        out.push(format!("architecture rtl of {} is", top));
        for lut in graph.lut_modules() {
            out.push(format!(
                "  signal {} : {};",
                naming::layer_signal(lut.layer),
                vector(lut.output_width())
            ));
        }
        out.push("begin".to_string());

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
                format!("  {} : entity work.{}", label, module.name()),
                "    port map (".to_string(),
                format!("      {} => {},", naming::INPUT_PORT, source),
                format!("      {} => {}", naming::OUTPUT_PORT, sink),
                "    );".to_string(),
            ]);
            source = sink;
        }
        out.push(String::new());
        out.push("end architecture rtl;".to_string());

        SourceFile {
            name: Self::file_name(&top),
            contents: finish(out),
        }
    }
}

impl Emitter for VhdlEmitter {
    fn dialect(&self) -> Dialect {
        Dialect::Vhdl
    }

    fn emit(&self, params: &ModelParams, graph: &ModuleGraph) -> GenResult<SourceTree> {
        check_graph(Dialect::Vhdl, params, graph)?;
        let mut files = Vec::with_capacity(graph.modules().len() + 2);
        for module in graph.modules() {
            files.push(match module {
                Module::Lut(lut) => self.lower_layer(graph, lut),
                Module::Argmax(argmax) => self.lower_argmax(graph, argmax),
            });
        }
        files.push(self.lower_top(graph));
        Ok(SourceTree::assemble(Dialect::Vhdl, graph, files))
    }
}

fn vector(width: usize) -> String {
    format!("std_logic_vector({} downto 0)", width - 1)
}

fn std_logic(bit: bool) -> &'static str {
    if bit {
        "'1'"
    } else {
        "'0'"
    }
}

fn libraries(numeric: bool) -> Vec<String> {
    let mut out = vec![
        "library ieee;".to_string(),
        "use ieee.std_logic_1164.all;".to_string(),
    ];
    if numeric {
        out.push("use ieee.numeric_std.all;".to_string());
    }
    out.push(String::new());
    out
}

fn entity(name: &str, inputs: usize, outputs: usize) -> Vec<String> {
    vec![
        format!("entity {} is", name),
        "  port (".to_string(),
        format!("    {} : in  {};", naming::INPUT_PORT, vector(inputs)),
        format!("    {} : out {}", naming::OUTPUT_PORT, vector(outputs)),
        "  );".to_string(),
        format!("end entity {};", name),
        String::new(),
    ]
}
