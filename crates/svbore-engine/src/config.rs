//! Pipeline-register configuration
//!
//! Pipeline registers are inserted on the producing side of a routed XMR
//! for timing closure. Three modes:
//! 1. **Global**: a fixed number of stages in the target module
//! 2. **PerModule**: one stage per crossed module boundary
//! 3. **Selective**: stages summed over matching entries

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PipeRegMode {
    #[default]
    None,
    Global,
    PerModule,
    Selective,
}

/// One selective-mode entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipeRegEntry {
    pub reg_count: u32,
    /// Signals the entry applies to; empty matches every signal
    pub signals: Vec<String>,
}

/// Pipeline-register configuration for one source module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipeRegConfig {
    pub mode: PipeRegMode,
    pub global_reg_count: u32,
    pub entries: Vec<PipeRegEntry>,
}

impl PipeRegConfig {
    pub fn global(reg_count: u32) -> Self {
        PipeRegConfig {
            mode: PipeRegMode::Global,
            global_reg_count: reg_count,
            entries: Vec::new(),
        }
    }

    pub fn per_module() -> Self {
        PipeRegConfig {
            mode: PipeRegMode::PerModule,
            ..Default::default()
        }
    }

    pub fn selective(entries: Vec<PipeRegEntry>) -> Self {
        PipeRegConfig {
            mode: PipeRegMode::Selective,
            global_reg_count: 0,
            entries,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != PipeRegMode::None
    }

    /// Number of stages for a routed XMR: `path_len` is the instance-path
    /// length, `port_name`/`target_signal` feed selective matching
    pub fn stages_for(&self, path_len: usize, port_name: &str, target_signal: &str) -> u32 {
        match self.mode {
            PipeRegMode::None => 0,
            PipeRegMode::Global => self.global_reg_count,
            PipeRegMode::PerModule => path_len as u32,
            PipeRegMode::Selective => self
                .entries
                .iter()
                .filter(|e| e.reg_count > 0)
                .filter(|e| {
                    e.signals.is_empty()
                        || e.signals
                            .iter()
                            .any(|s| s == port_name || s == target_signal)
                })
                .map(|e| e.reg_count)
                .sum(),
        }
    }
}

/// Everything the change planner needs besides the XMR list and the design
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Per-source-module pipeline-register configuration
    pub pipe_regs: IndexMap<String, PipeRegConfig>,
    pub clock_name: String,
    pub reset_name: String,
    pub reset_active_low: bool,
}

impl Default for PlanConfig {
    fn default() -> Self {
        PlanConfig {
            pipe_regs: IndexMap::new(),
            clock_name: "clk".to_string(),
            reset_name: "rst_n".to_string(),
            reset_active_low: true,
        }
    }
}
