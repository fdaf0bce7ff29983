//! Pre-rewrite verification
//!
//! Pipeline registers need a clock and a reset in every module they are
//! requested for. This runs before any rewriting so a misconfigured run
//! aborts without touching output files.

use crate::config::PlanConfig;
use svbore_frontend::Design;

/// Check that every module with pipeline registers enabled exposes the
/// configured clock and reset signals. Returns one message per missing
/// signal; empty means the configuration is usable.
pub fn verify_clock_reset(design: &Design, config: &PlanConfig) -> Vec<String> {
    let mut errors = Vec::new();
    for (module_name, pipe_cfg) in &config.pipe_regs {
        if !pipe_cfg.is_enabled() {
            continue;
        }
        let Some(def) = design.module(module_name) else {
            errors.push(format!(
                "Pipeline registers requested for unknown module '{}'",
                module_name
            ));
            continue;
        };
        if !def.has_signal(&config.clock_name) {
            errors.push(format!(
                "Pipeline registers requested for module '{}' but clock signal '{}' not found",
                module_name, config.clock_name
            ));
        }
        if !def.has_signal(&config.reset_name) {
            errors.push(format!(
                "Pipeline registers requested for module '{}' but reset signal '{}' not found",
                module_name, config.reset_name
            ));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipeRegConfig;
    use indexmap::IndexSet;
    use svbore_frontend::parse_file;

    fn design(src: &str) -> Design {
        let mut defines = IndexSet::new();
        let file = parse_file("t.sv", src.to_string(), &mut defines).unwrap();
        Design::new(vec![file]).unwrap()
    }

    fn config_for(module: &str) -> PlanConfig {
        let mut cfg = PlanConfig::default();
        cfg.pipe_regs
            .insert(module.to_string(), PipeRegConfig::global(2));
        cfg
    }

    #[test]
    fn passes_when_clock_and_reset_exist() {
        let d = design("module m(input wire clk, input wire rst_n); endmodule");
        assert!(verify_clock_reset(&d, &config_for("m")).is_empty());
    }

    #[test]
    fn reports_missing_clock_and_reset() {
        let d = design("module m; endmodule");
        let errors = verify_clock_reset(&d, &config_for("m"));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("clock signal 'clk' not found"));
        assert!(errors[1].contains("reset signal 'rst_n' not found"));
    }

    #[test]
    fn body_nets_count_as_signals() {
        let d = design("module m; logic clk; logic rst_n; endmodule");
        assert!(verify_clock_reset(&d, &config_for("m")).is_empty());
    }

    #[test]
    fn disabled_config_is_not_checked() {
        let d = design("module m; endmodule");
        let mut cfg = PlanConfig::default();
        cfg.pipe_regs
            .insert("m".to_string(), PipeRegConfig::default());
        assert!(verify_clock_reset(&d, &cfg).is_empty());
    }
}
