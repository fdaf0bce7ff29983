//! End-to-end tests for XMR elimination

use std::fs;
use std::path::PathBuf;
use svbore::{xmr_eliminate, EliminateConfig, EliminateResult, PipeRegConfig};
use tempfile::TempDir;

/// Write the given (name, content) files into a temp dir and run the engine
fn run(files: &[(&str, &str)], config: &EliminateConfig) -> (TempDir, EliminateResult) {
    let dir = TempDir::new().unwrap();
    let mut inputs = Vec::new();
    for (name, content) in files {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        inputs.push(path);
    }
    let out_dir = dir.path().join("out");
    let result = xmr_eliminate(&inputs, config, Some(&out_dir));
    (dir, result)
}

fn module_text<'a>(result: &'a EliminateResult, module: &str) -> &'a str {
    let needle = format!("module {}", module);
    result
        .modified_files
        .iter()
        .find(|content| content.contains(&needle))
        .unwrap_or_else(|| panic!("no output contains '{}'", needle))
}

//==============================================================================
// Basic scenarios
//==============================================================================

#[test]
fn single_downward_read() {
    let (_dir, result) = run(
        &[(
            "design.sv",
            "module top(output wire result);\n  sub u_sub();\n  assign result = u_sub.sig;\nendmodule\nmodule sub; reg sig; endmodule\n",
        )],
        &EliminateConfig::default(),
    );
    assert!(result.success(), "errors: {:?}", result.errors);
    assert_eq!(result.eliminated_xmrs.len(), 1);

    let out = &result.modified_files[0];
    // Source module: local wire, named binding, substituted expression
    assert!(out.contains("wire __xmr__u_sub_sig;"));
    assert!(out.contains(".__xmr__u_sub_sig(__xmr__u_sub_sig)"));
    assert!(out.contains("assign result =  __xmr__u_sub_sig;"));
    assert!(!out.contains("u_sub.sig"));
    // Target module: headerless module gains a non-ANSI port list,
    // a directional declaration, and the export assign
    assert!(out.contains("module sub(__xmr__u_sub_sig);"));
    assert!(out.contains("output wire __xmr__u_sub_sig;"));
    assert!(out.contains("assign __xmr__u_sub_sig = sig;"));
}

#[test]
fn deep_downward_read() {
    let (_dir, result) = run(
        &[
            (
                "top.sv",
                "module top;\n  l1 u_l1();\n  wire w;\n  assign w = u_l1.u_l2.u_l3.deep;\nendmodule\n",
            ),
            ("l1.sv", "module l1;\n  l2 u_l2();\nendmodule\n"),
            ("l2.sv", "module l2;\n  l3 u_l3();\nendmodule\n"),
            ("l3.sv", "module l3;\n  reg deep;\nendmodule\n"),
        ],
        &EliminateConfig::default(),
    );
    assert!(result.success(), "errors: {:?}", result.errors);

    let port = "__xmr__u_l1_u_l2_u_l3_deep";
    for module in ["l1", "l2", "l3"] {
        let text = module_text(&result, module);
        assert!(
            text.contains(&format!("output wire {}", port)),
            "{} missing port",
            module
        );
    }
    assert!(module_text(&result, "top").contains(&format!("wire {};", port)));
    assert!(module_text(&result, "l3").contains(&format!("assign {} = deep;", port)));

    // One binding per hop
    let bindings: usize = result
        .modified_files
        .iter()
        .map(|c| c.matches(&format!(".{}({})", port, port)).count())
        .sum();
    assert_eq!(bindings, 3);
}

#[test]
fn array_index_is_preserved_outside_the_port() {
    let (_dir, result) = run(
        &[(
            "design.sv",
            "module top;\n  sub u_sub();\n  wire [7:0] w;\n  assign w = u_sub.arr[3];\nendmodule\nmodule sub;\n  reg [7:0] arr;\nendmodule\n",
        )],
        &EliminateConfig::default(),
    );
    assert!(result.success(), "errors: {:?}", result.errors);
    let out = &result.modified_files[0];
    // Full symbol width on the port, index only at the use site
    assert!(out.contains("output wire [7:0] __xmr__u_sub_arr;"));
    assert!(out.contains("wire [7:0] __xmr__u_sub_arr;"));
    assert!(out.contains("__xmr__u_sub_arr[3]"));
    assert!(!out.contains("__xmr__u_sub_arr_3"));
    assert_eq!(result.eliminated_xmrs[0].bit_width, 8);
}

#[test]
fn dpi_output_argument_writes_through_an_input_port() {
    let (_dir, result) = run(
        &[(
            "design.sv",
            "module top;\n  sub u_sub();\n  import \"DPI-C\" function void get(output bit [7:0] v);\n  initial get(u_sub.v);\nendmodule\nmodule sub;\n  reg [7:0] v;\nendmodule\n",
        )],
        &EliminateConfig::default(),
    );
    assert!(result.success(), "errors: {:?}", result.errors);
    let out = &result.modified_files[0];
    // Direction flips: the chain carries the value down into the target
    assert!(out.contains("input wire [7:0] __xmr__u_sub_v;"));
    assert!(out.contains("assign v = __xmr__u_sub_v;"));
    assert!(out.contains("wire [7:0] __xmr__u_sub_v;"));
    assert!(out.contains(".__xmr__u_sub_v(__xmr__u_sub_v)"));
    assert!(out.contains("get( __xmr__u_sub_v)"));
}

#[test]
fn upward_reference_from_sibling() {
    let (_dir, result) = run(
        &[
            (
                "tb_top.sv",
                "module tb_top;\n  dut uut();\n  others other_inst();\nendmodule\n",
            ),
            ("dut.sv", "module dut;\n  reg [3:0] counter;\nendmodule\n"),
            (
                "others.sv",
                "module others;\n  wire [3:0] w;\n  assign w = tb_top.uut.counter;\nendmodule\n",
            ),
        ],
        &EliminateConfig::default(),
    );
    assert!(result.success(), "errors: {:?}", result.errors);
    let port = "__xmr__tb_top_uut_counter";

    let others = module_text(&result, "others");
    assert!(others.contains(&format!("input wire [3:0] {};", port)));

    let tb = module_text(&result, "tb_top");
    assert!(tb.contains(&format!("wire [3:0] {};", port)));
    assert!(tb.contains(&format!(".{}({})", port, port)));
    // Both the producer and the consumer instance get bound
    assert_eq!(tb.matches(&format!(".{}({})", port, port)).count(), 2);

    let dut = module_text(&result, "dut");
    assert!(dut.contains(&format!("output wire [3:0] {};", port)));
    assert!(dut.contains(&format!("assign {} = counter;", port)));
}

#[test]
fn self_reference_substitutes_without_routing() {
    let src = "module top;\n  reg clock;\n  wire w;\n  assign w = top.clock;\nendmodule\n";
    let (_dir, result) = run(&[("design.sv", src)], &EliminateConfig::default());
    assert!(result.success(), "errors: {:?}", result.errors);
    let out = &result.modified_files[0];
    assert!(!out.contains("__xmr__"));
    assert!(!out.contains("top.clock"));
    assert!(out.contains("assign w =  clock;"));
}

//==============================================================================
// Properties
//==============================================================================

#[test]
fn unchanged_text_round_trips() {
    let src = "// file header comment\nmodule top(output wire result);\n  /* keep me */\n  sub u_sub();\n  assign result = u_sub.sig;\nendmodule\nmodule sub; reg sig; endmodule\n";
    let (_dir, result) = run(&[("design.sv", src)], &EliminateConfig::default());
    assert!(result.success());
    let out = &result.modified_files[0];
    assert!(out.contains("// file header comment"));
    assert!(out.contains("/* keep me */"));
    assert!(out.contains("  sub u_sub("));
}

#[test]
fn outputs_are_deterministic() {
    let files: &[(&str, &str)] = &[(
        "design.sv",
        "module top;\n  sub u_sub();\n  wire a, b;\n  assign a = u_sub.sig;\n  assign b = u_sub.other[2];\nendmodule\nmodule sub;\n  reg sig;\n  reg [3:0] other;\nendmodule\n",
    )];
    let (_d1, first) = run(files, &EliminateConfig::default());
    let (_d2, second) = run(files, &EliminateConfig::default());
    // Marker lines embed temp paths; compare everything below them
    let strip = |r: &EliminateResult| {
        r.modified_files
            .iter()
            .map(|c| svbore_rewrite::strip_markers(c))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first), strip(&second));
}

#[test]
fn running_on_own_output_changes_nothing() {
    let (dir, result) = run(
        &[(
            "design.sv",
            "module top;\n  sub u_sub();\n  wire w;\n  assign w = u_sub.sig;\nendmodule\nmodule sub; reg sig; endmodule\n",
        )],
        &EliminateConfig::default(),
    );
    assert!(result.success());

    let emitted = dir.path().join("out").join("design.sv");
    let first_pass = fs::read_to_string(&emitted).unwrap();

    let second_out = dir.path().join("out2");
    let second = xmr_eliminate(
        &[emitted],
        &EliminateConfig::default(),
        Some(&second_out),
    );
    assert!(second.success());
    // Nothing left to eliminate; content comes back untouched
    assert!(second.eliminated_xmrs.is_empty());
    assert!(second
        .warnings
        .iter()
        .any(|w| w.contains("No XMR references found")));
    assert_eq!(second.modified_files[0], first_pass);
}

#[test]
fn duplicate_references_share_one_chain() {
    let (_dir, result) = run(
        &[(
            "design.sv",
            "module top;\n  sub u_sub();\n  wire a, b, c;\n  assign a = u_sub.arr[3];\n  assign b = u_sub.arr[1];\n  assign c = u_sub.arr[3];\nendmodule\nmodule sub;\n  reg [7:0] arr;\nendmodule\n",
        )],
        &EliminateConfig::default(),
    );
    assert!(result.success());
    let out = &result.modified_files[0];
    // One port declaration, one binding, one export assign
    assert_eq!(out.matches("output wire [7:0] __xmr__u_sub_arr").count(), 1);
    assert_eq!(out.matches(".__xmr__u_sub_arr(__xmr__u_sub_arr)").count(), 1);
    assert_eq!(out.matches("assign __xmr__u_sub_arr = arr;").count(), 1);
    // Every use site substituted with its own suffix
    assert!(out.contains("__xmr__u_sub_arr[1]"));
    assert_eq!(out.matches("__xmr__u_sub_arr[3]").count(), 2);
}

#[test]
fn ansi_port_list_is_extended_in_place() {
    let (_dir, result) = run(
        &[(
            "design.sv",
            "module top(input wire clk);\n  sub u_sub(.clk(clk));\n  wire w;\n  assign w = u_sub.data;\nendmodule\nmodule sub(input wire clk);\n  reg data;\nendmodule\n",
        )],
        &EliminateConfig::default(),
    );
    assert!(result.success(), "errors: {:?}", result.errors);
    let out = &result.modified_files[0];
    assert!(out.contains("module sub(input wire clk,\n    output wire __xmr__u_sub_data);"));
    assert!(out.contains(".clk(clk),\n        .__xmr__u_sub_data(__xmr__u_sub_data)"));
}

//==============================================================================
// Pipeline registers
//==============================================================================

#[test]
fn pipeline_registers_replace_the_export_assign() {
    let mut config = EliminateConfig {
        modules: vec!["top".to_string()],
        ..Default::default()
    };
    config
        .pipe_regs
        .insert("top".to_string(), PipeRegConfig::global(2));

    let (_dir, result) = run(
        &[(
            "design.sv",
            "module top(input wire clk, input wire rst_n);\n  sub u_sub(.clk(clk), .rst_n(rst_n));\n  wire [7:0] w;\n  assign w = u_sub.data;\nendmodule\nmodule sub(input wire clk, input wire rst_n);\n  reg [7:0] data;\nendmodule\n",
        )],
        &config,
    );
    assert!(result.success(), "errors: {:?}", result.errors);
    let out = &result.modified_files[0];
    assert!(out.contains("reg [7:0] __xmr__u_sub_data_pipe_0;"));
    assert!(out.contains("reg [7:0] __xmr__u_sub_data_pipe_1;"));
    assert!(out.contains("always @(posedge clk or negedge rst_n) begin"));
    assert!(out.contains("__xmr__u_sub_data_pipe_0 <= data;"));
    assert!(out.contains("__xmr__u_sub_data_pipe_1 <= __xmr__u_sub_data_pipe_0;"));
    assert!(out.contains("assign __xmr__u_sub_data = __xmr__u_sub_data_pipe_1;"));
    // No direct export assign next to the pipeline
    assert!(!out.contains("assign __xmr__u_sub_data = data;"));
}

#[test]
fn missing_clock_aborts_before_rewriting() {
    let mut config = EliminateConfig {
        modules: vec!["top".to_string()],
        ..Default::default()
    };
    config
        .pipe_regs
        .insert("top".to_string(), PipeRegConfig::global(1));

    let (dir, result) = run(
        &[(
            "design.sv",
            "module top;\n  sub u_sub();\n  wire w;\n  assign w = u_sub.data;\nendmodule\nmodule sub;\n  reg data;\nendmodule\n",
        )],
        &config,
    );
    assert!(!result.success());
    assert!(result.errors.iter().any(|e| e.contains("clock signal 'clk' not found")));
    assert!(result.modified_files.is_empty());
    assert!(!dir.path().join("out").join("design.sv").exists());
}

//==============================================================================
// Error handling and artifacts
//==============================================================================

#[test]
fn empty_input_list_is_a_configuration_error() {
    let result = xmr_eliminate(&[], &EliminateConfig::default(), None);
    assert!(!result.success());
    assert_eq!(result.errors[0], "No input files provided");
}

#[test]
fn missing_input_file_is_a_configuration_error() {
    let result = xmr_eliminate(
        &[PathBuf::from("no_such_file.sv")],
        &EliminateConfig::default(),
        None,
    );
    assert!(!result.success());
    assert!(result.errors[0].contains("does not exist"));
}

#[test]
fn unknown_top_module_is_rejected() {
    let config = EliminateConfig {
        top_module: "ghost".to_string(),
        ..Default::default()
    };
    let (_dir, result) = run(&[("a.sv", "module a; endmodule\n")], &config);
    assert!(!result.success());
    assert!(result.errors[0].contains("Unknown top module"));
}

#[test]
fn no_xmrs_warns_and_passes_content_through() {
    let src = "module simple(input wire clk, output reg q);\n  always @(posedge clk) q <= ~q;\nendmodule\n";
    let (_dir, result) = run(&[("simple.sv", src)], &EliminateConfig::default());
    assert!(result.success());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("No XMR references found")));
    assert!(result.eliminated_xmrs.is_empty());
    assert_eq!(result.modified_files[0], src);
}

#[test]
fn multiple_tops_without_choice_warn() {
    let (_dir, result) = run(
        &[(
            "design.sv",
            "module a;\n  sub u_sub();\n  wire w;\n  assign w = u_sub.sig;\nendmodule\nmodule b; endmodule\nmodule sub; reg sig; endmodule\n",
        )],
        &EliminateConfig::default(),
    );
    assert!(result.success());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("Multiple top modules detected")));
    assert_eq!(result.detected_top_modules, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn outputs_carry_markers_and_land_in_the_output_dir() {
    let (dir, result) = run(
        &[(
            "design.sv",
            "module top;\n  sub u_sub();\n  wire w;\n  assign w = u_sub.sig;\nendmodule\nmodule sub; reg sig; endmodule\n",
        )],
        &EliminateConfig::default(),
    );
    assert!(result.success());
    let content = &result.modified_files[0];
    assert!(content.starts_with("//BEGIN:"));
    assert!(content.trim_end().ends_with(&format!(
        "//END:{}",
        dir.path().join("design.sv").display()
    )));

    let written = dir.path().join("out").join("design.sv");
    assert!(written.exists());
    assert_eq!(&fs::read_to_string(written).unwrap(), content);

    // Backups are cleaned up on success
    let work = dir.path().join("out").join(".work");
    assert!(!work.join("design.sv.bak").exists());
}

#[test]
fn check_output_recompiles_cleanly() {
    let config = EliminateConfig {
        check_output: true,
        ..Default::default()
    };
    let (_dir, result) = run(
        &[(
            "design.sv",
            "module top;\n  sub u_sub();\n  wire w;\n  assign w = u_sub.sig;\nendmodule\nmodule sub; reg sig; endmodule\n",
        )],
        &config,
    );
    assert!(result.success(), "errors: {:?}", result.errors);
    assert!(result.warnings.iter().all(|w| !w.contains("still contains XMR")));
}

#[test]
fn module_filter_limits_rewriting() {
    let config = EliminateConfig {
        modules: vec!["other".to_string()],
        ..Default::default()
    };
    let (_dir, result) = run(
        &[(
            "design.sv",
            "module top;\n  sub u_sub();\n  wire w;\n  assign w = u_sub.sig;\nendmodule\nmodule sub; reg sig; endmodule\n",
        )],
        &config,
    );
    // The only XMR lives in `top`, which is filtered out
    assert!(result.success());
    assert!(result.eliminated_xmrs.is_empty());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("No XMR references found")));
}

#[test]
fn summary_reports_the_run() {
    let (_dir, result) = run(
        &[(
            "design.sv",
            "module top;\n  sub u_sub();\n  wire w;\n  assign w = u_sub.sig;\nendmodule\nmodule sub; reg sig; endmodule\n",
        )],
        &EliminateConfig::default(),
    );
    let summary = result.summary();
    assert!(summary.contains("XMRs Eliminated: 1"));
    assert!(summary.contains("Module: top (1 XMRs)"));
    assert!(summary.contains("u_sub.sig -> sub.sig (width: 1)"));
    assert!(summary.contains("Target Modules Affected: sub"));
}
