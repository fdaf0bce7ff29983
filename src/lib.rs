//! svbore - Cross-Module Reference elimination for SystemVerilog
//!
//! Takes a compiled design full of hierarchical references like
//! `u_sub.u_child.signal` or `tb_top.uut.counter` and rewrites it so every
//! cross-hierarchy signal travels through declared ports, with optional
//! pipeline registers on the producing side for timing closure. Unchanged
//! tokens, whitespace, and comments round-trip byte-faithfully.
//!
//! ```no_run
//! use std::path::PathBuf;
//! use svbore::{xmr_eliminate, EliminateConfig};
//!
//! let config = EliminateConfig {
//!     modules: vec!["top".to_string()],
//!     ..Default::default()
//! };
//! let inputs = vec![PathBuf::from("design.sv")];
//! let result = xmr_eliminate(&inputs, &config, None);
//! for content in &result.modified_files {
//!     // write or inspect rewritten sources
//! }
//! ```

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use svbore_engine::{compute_changes, verify_clock_reset, PlanConfig};
use svbore_frontend::{parse_file, Design, SourceLoader};
use svbore_rewrite::{
    backup_file, remove_backups, rewrite_instance_connections, rewrite_module_bodies,
    wrap_with_markers, write_output_file, ConnectionKeys,
};

pub use svbore_engine::{PipeRegConfig, PipeRegEntry, PipeRegMode, XmrInfo};
pub use svbore_frontend::SourceOptions as DriverOptions;

/// Configuration for one elimination run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EliminateConfig {
    /// Source modules to process; empty means every module with XMRs
    pub modules: Vec<String>,
    /// Top module name; empty means auto-detect
    pub top_module: String,
    /// Per-source-module pipeline-register configuration
    pub pipe_regs: IndexMap<String, PipeRegConfig>,
    /// Clock signal name for pipeline registers
    pub clock_name: String,
    /// Reset signal name for pipeline registers
    pub reset_name: String,
    /// Reset polarity
    pub reset_active_low: bool,
    /// Parser driver options: include dirs, defines, library search
    #[serde(skip)]
    pub driver: DriverOptions,
    /// Re-compile the emitted files after the run
    pub check_output: bool,
}

impl Default for EliminateConfig {
    fn default() -> Self {
        EliminateConfig {
            modules: Vec::new(),
            top_module: String::new(),
            pipe_regs: IndexMap::new(),
            clock_name: "clk".to_string(),
            reset_name: "rst_n".to_string(),
            reset_active_low: true,
            driver: DriverOptions::default(),
            check_output: false,
        }
    }
}

impl EliminateConfig {
    fn plan_config(&self) -> PlanConfig {
        PlanConfig {
            pipe_regs: self.pipe_regs.clone(),
            clock_name: self.clock_name.clone(),
            reset_name: self.reset_name.clone(),
            reset_active_low: self.reset_active_low,
        }
    }
}

/// Result of one elimination run
#[derive(Debug, Default)]
pub struct EliminateResult {
    /// Rewritten content per input file, marker-wrapped; empty string for a
    /// file whose rewrite failed
    pub modified_files: Vec<String>,
    /// Every XMR that was detected and routed
    pub eliminated_xmrs: Vec<XmrInfo>,
    /// Top modules found in the design, sorted
    pub detected_top_modules: Vec<String>,
    /// Top module actually used (configured or auto-detected)
    pub used_top_module: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub output_dir: PathBuf,
}

impl EliminateResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable run summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let rule = "=".repeat(80);
        s.push('\n');
        s.push_str(&rule);
        s.push_str("\n                          XMR ELIMINATION SUMMARY\n");
        s.push_str(&rule);
        s.push_str("\n\n");

        if !self.detected_top_modules.is_empty() {
            s.push_str(&format!(
                "Detected top module(s): {}\n",
                self.detected_top_modules.join(", ")
            ));
        }
        if !self.used_top_module.is_empty() {
            s.push_str(&format!("Used top module: {}\n", self.used_top_module));
        }
        s.push('\n');

        s.push_str(&format!("XMRs Eliminated: {}\n", self.eliminated_xmrs.len()));
        s.push_str(&format!("Output Directory: {}\n\n", self.output_dir.display()));

        if !self.eliminated_xmrs.is_empty() {
            let mut by_module: IndexMap<&str, Vec<&XmrInfo>> = IndexMap::new();
            for xmr in &self.eliminated_xmrs {
                by_module
                    .entry(xmr.source_module.as_str())
                    .or_default()
                    .push(xmr);
            }
            s.push_str("XMR Details by Module:\n");
            s.push_str("----------------------\n");
            for (module, xmrs) in &by_module {
                s.push_str(&format!("\n  Module: {} ({} XMRs)\n", module, xmrs.len()));
                for xmr in xmrs {
                    s.push_str(&format!(
                        "    - {} -> {}.{} (width: {})\n",
                        xmr.full_path, xmr.target_module, xmr.target_signal, xmr.bit_width
                    ));
                }
            }

            let targets: IndexSet<&str> = self
                .eliminated_xmrs
                .iter()
                .filter(|x| !x.target_module.is_empty())
                .map(|x| x.target_module.as_str())
                .collect();
            if !targets.is_empty() {
                let list: Vec<&str> = targets.into_iter().collect();
                s.push_str(&format!("\nTarget Modules Affected: {}\n", list.join(", ")));
            }
        }

        if !self.warnings.is_empty() {
            s.push_str("\nWarnings:\n");
            for w in &self.warnings {
                s.push_str(&format!("  - {}\n", w));
            }
        }
        if !self.errors.is_empty() {
            s.push_str("\nErrors:\n");
            for e in &self.errors {
                s.push_str(&format!("  - {}\n", e));
            }
        }

        s.push('\n');
        s.push_str(&rule);
        s.push('\n');
        s
    }
}

/// Detect XMRs in the given files without modifying anything.
///
/// `modules` filters by source module; empty keeps everything.
pub fn detect_xmrs(
    input_files: &[PathBuf],
    modules: &[String],
    options: &DriverOptions,
) -> anyhow::Result<Vec<XmrInfo>> {
    let mut loader = SourceLoader::new(options.clone());
    for file in input_files {
        loader.load_file(file)?;
    }
    loader.load_libraries()?;
    let design = loader.into_design()?;
    Ok(svbore_engine::detect_xmrs(&design, modules))
}

/// Eliminate every detected XMR in `input_files`, writing rewritten files
/// into `output_dir` (default `.xmrEliminate`).
///
/// Errors and warnings are carried on the result; as many files and as many
/// XMRs as possible are transformed even when others fail.
pub fn xmr_eliminate(
    input_files: &[PathBuf],
    config: &EliminateConfig,
    output_dir: Option<&Path>,
) -> EliminateResult {
    let mut result = EliminateResult {
        output_dir: output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".xmrEliminate")),
        ..Default::default()
    };

    // Step 1: validate inputs
    if input_files.is_empty() {
        result.errors.push("No input files provided".to_string());
        return result;
    }
    for file in input_files {
        if !file.exists() {
            result
                .errors
                .push(format!("Input file does not exist: {}", file.display()));
            return result;
        }
    }

    // Step 2: back up inputs into the work directory
    let work_dir = result.output_dir.join(".work");
    let mut backups = Vec::new();
    for file in input_files {
        match backup_file(file, &work_dir) {
            Ok(backup) => backups.push(backup),
            Err(e) => {
                result
                    .errors
                    .push(format!("Failed to back up '{}': {}", file.display(), e));
                return result;
            }
        }
    }

    // Step 3: load and elaborate
    let mut loader = SourceLoader::new(config.driver.clone());
    let mut primary = Vec::with_capacity(input_files.len());
    for file in input_files {
        match loader.load_file(file) {
            Ok(idx) => primary.push(idx),
            Err(e) => {
                result.errors.push(e.to_string());
                remove_backups(&backups);
                return result;
            }
        }
    }
    if let Err(e) = loader.load_libraries() {
        result.errors.push(e.to_string());
    }
    let design = match loader.into_design() {
        Ok(design) => design,
        Err(e) => {
            result.errors.push(e.to_string());
            remove_backups(&backups);
            return result;
        }
    };

    // Step 4: top modules
    let mut tops = design.top_module_names();
    tops.sort();
    result.detected_top_modules = tops.clone();
    info!(tops = ?tops, "detected top modules");
    if !config.top_module.is_empty() {
        if design.module(&config.top_module).is_none() {
            result
                .errors
                .push(format!("Unknown top module '{}'", config.top_module));
            remove_backups(&backups);
            return result;
        }
        result.used_top_module = config.top_module.clone();
    } else if tops.len() == 1 {
        result.used_top_module = tops[0].clone();
    } else if tops.len() > 1 {
        result.warnings.push(format!(
            "Multiple top modules detected ({}). Use -t to specify one.",
            tops.join(", ")
        ));
    }

    // Step 5: detect
    let xmrs = svbore_engine::detect_xmrs(&design, &config.modules);
    if xmrs.is_empty() {
        result
            .warnings
            .push("No XMR references found in specified modules".to_string());
        emit_unchanged(&design, &primary, &mut result);
        remove_backups(&backups);
        return result;
    }
    info!(count = xmrs.len(), "detected XMRs");
    result.eliminated_xmrs = xmrs.clone();

    // Step 6: verify clock/reset before touching anything
    let plan_config = config.plan_config();
    if plan_config.pipe_regs.values().any(PipeRegConfig::is_enabled) {
        let errors = verify_clock_reset(&design, &plan_config);
        if !errors.is_empty() {
            result.errors = errors;
            remove_backups(&backups);
            return result;
        }
    }

    // Step 7: plan
    let root = design.instance_tree(None);
    let outcome = compute_changes(&xmrs, &root, &plan_config);
    for error in &outcome.errors {
        result.errors.push(error.to_string());
    }
    if outcome.changes.is_empty() {
        result
            .warnings
            .push("XMRs detected but no routing plan was possible".to_string());
        emit_unchanged(&design, &primary, &mut result);
        remove_backups(&backups);
        return result;
    }

    // Steps 8-9: two rewrite passes. Pass 2 re-parses pass 1's output, so
    // it only ever sees state pass 1 finalized.
    let mut defines: IndexSet<String> = config.driver.defines.iter().cloned().collect();
    for undef in &config.driver.undefines {
        defines.shift_remove(undef);
    }
    let mut connection_keys = ConnectionKeys::new();
    for &idx in &primary {
        let file = &design.files[idx];
        let rewritten = rewrite_module_bodies(file, &outcome.changes)
            .map_err(|e| format!("First rewrite pass failed for '{}': {}", file.path, e))
            .and_then(|text| {
                parse_file(&file.path, text, &mut defines)
                    .map_err(|e| format!("Re-parse failed for '{}': {}", file.path, e))
            })
            .and_then(|reparsed| {
                rewrite_instance_connections(&reparsed, &outcome.changes, &mut connection_keys)
                    .map_err(|e| format!("Second rewrite pass failed for '{}': {}", file.path, e))
            });
        match rewritten {
            Ok(text) => result
                .modified_files
                .push(wrap_with_markers(&text, &file.path)),
            Err(message) => {
                result.errors.push(message);
                result.modified_files.push(String::new());
            }
        }
    }

    // Step 10: write outputs, drop backups
    for content in &result.modified_files {
        if content.is_empty() {
            continue;
        }
        if let Err(e) = write_output_file(content, &result.output_dir) {
            result.errors.push(format!("Failed to write output: {}", e));
        }
    }
    remove_backups(&backups);

    // Step 11: optionally re-compile what was emitted
    if config.check_output {
        check_output_files(input_files, config, &mut result);
    }

    result
}

/// Push original file contents untouched (no-XMR and no-plan paths)
fn emit_unchanged(design: &Design, primary: &[usize], result: &mut EliminateResult) {
    for &idx in primary {
        result.modified_files.push(design.files[idx].text.clone());
    }
}

/// Re-parse and re-elaborate the emitted files; compile problems land in
/// the result's errors
fn check_output_files(
    input_files: &[PathBuf],
    config: &EliminateConfig,
    result: &mut EliminateResult,
) {
    let mut loader = SourceLoader::new(config.driver.clone());
    let mut loaded_any = false;
    for input in input_files {
        let Some(name) = input.file_name() else { continue };
        let output = result.output_dir.join(name);
        if !output.exists() {
            continue;
        }
        loaded_any = true;
        if let Err(e) = loader.load_file(&output) {
            result.errors.push(format!("[check] {}", e));
            return;
        }
    }
    if !loaded_any {
        result
            .errors
            .push("No output files found to check".to_string());
        return;
    }
    match loader.into_design() {
        Ok(design) => {
            info!("output files compiled successfully");
            // A clean second pass must find nothing left to eliminate
            let remaining = svbore_engine::detect_xmrs(&design, &config.modules);
            if !remaining.is_empty() {
                warn!(count = remaining.len(), "output still contains XMRs");
                for xmr in remaining {
                    result.warnings.push(format!(
                        "[check] output still contains XMR '{}' in module '{}'",
                        xmr.full_path, xmr.source_module
                    ));
                }
            }
        }
        Err(e) => result.errors.push(format!("[check] {}", e)),
    }
}
