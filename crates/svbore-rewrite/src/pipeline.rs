//! Pipeline-register block generation
//!
//! Pure string producer: given a routed signal and a stage count, emits the
//! register declarations, one always block with asynchronous reset, and the
//! final continuous assign that drives the output from the last stage.

use svbore_engine::PipeRegDecl;

/// Width prefix for declarations, empty for single-bit signals
pub fn width_spec(width: u32) -> String {
    if width > 1 {
        format!("[{}:0] ", width - 1)
    } else {
        String::new()
    }
}

/// Generate the pipeline block for one declaration. Returns an empty string
/// when no stages are requested.
pub fn generate_pipeline_registers(decl: &PipeRegDecl) -> String {
    if decl.stages == 0 {
        return String::new();
    }

    let mut out = String::new();
    let width = width_spec(decl.width);
    let base = &decl.output_signal;
    let reset_cond = if decl.reset_active_low {
        format!("!{}", decl.reset)
    } else {
        decl.reset.clone()
    };
    let reset_edge = if decl.reset_active_low {
        "negedge"
    } else {
        "posedge"
    };

    for i in 0..decl.stages {
        out.push_str(&format!("    reg {}{}_pipe_{};\n", width, base, i));
    }

    out.push_str(&format!(
        "    always @(posedge {} or {} {}) begin\n",
        decl.clock, reset_edge, decl.reset
    ));
    out.push_str(&format!("        if ({}) begin\n", reset_cond));
    for i in 0..decl.stages {
        out.push_str(&format!(
            "            {}_pipe_{} <= {}'h0;\n",
            base, i, decl.width
        ));
    }
    out.push_str("        end else begin\n");
    out.push_str(&format!(
        "            {}_pipe_0 <= {};\n",
        base, decl.input_signal
    ));
    for i in 1..decl.stages {
        out.push_str(&format!(
            "            {}_pipe_{} <= {}_pipe_{};\n",
            base,
            i,
            base,
            i - 1
        ));
    }
    out.push_str("        end\n");
    out.push_str("    end\n");

    out.push_str(&format!(
        "    assign {} = {}_pipe_{};\n",
        base,
        base,
        decl.stages - 1
    ));

    out
}
