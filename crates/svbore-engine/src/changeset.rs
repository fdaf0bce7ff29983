//! The total edit plan computed before any rewriting begins
//!
//! Per-module collections use `IndexMap` so iteration order is the planner's
//! insertion order: for a fixed input the plan, and therefore the output
//! text, is byte-identical across runs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Direction of a synthesized port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// A port to add to a module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortChange {
    pub port_name: String,
    pub direction: Direction,
    pub width: u32,
    /// For ports generated on the signal-owning module: the signal an
    /// assign statement pairs with the port
    pub signal_to_assign: Option<String>,
}

/// A local net declaration to add to a module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDecl {
    pub wire_name: String,
    pub width: u32,
}

/// A named connection to add to one instantiation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionChange {
    /// Module containing the instantiation
    pub parent_module: String,
    pub instance_name: String,
    /// Module type of the instance
    pub instance_module: String,
    pub port_name: String,
    /// Local signal bound to the port
    pub signal_name: String,
}

/// A pipeline-register block to generate in a module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeRegDecl {
    pub input_signal: String,
    pub output_signal: String,
    pub width: u32,
    pub stages: u32,
    pub clock: String,
    pub reset: String,
    pub reset_active_low: bool,
}

/// All changes needed to eliminate the detected XMRs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Per module-definition name
    pub ports_to_add: IndexMap<String, Vec<PortChange>>,
    pub wires_to_add: IndexMap<String, Vec<WireDecl>>,
    /// Complete continuous-assign statements, e.g. `assign p = sig;`
    pub assigns_to_add: IndexMap<String, Vec<String>>,
    pub pipe_regs_to_add: IndexMap<String, Vec<PipeRegDecl>>,
    pub connection_changes: Vec<ConnectionChange>,
    /// `(source_module, original_path_text)` -> replacement expression text
    pub xmr_replacements: IndexMap<(String, String), String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.ports_to_add.is_empty()
            && self.wires_to_add.is_empty()
            && self.assigns_to_add.is_empty()
            && self.pipe_regs_to_add.is_empty()
            && self.connection_changes.is_empty()
            && self.xmr_replacements.is_empty()
    }

    /// Replacement lookup used by the rewriter's expression pass
    pub fn replacement(&self, source_module: &str, path_text: &str) -> Option<&str> {
        self.xmr_replacements
            .get(&(source_module.to_string(), path_text.to_string()))
            .map(String::as_str)
    }

    pub fn ports_for(&self, module: &str) -> &[PortChange] {
        self.ports_to_add.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn wires_for(&self, module: &str) -> &[WireDecl] {
        self.wires_to_add.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn assigns_for(&self, module: &str) -> &[String] {
        self.assigns_to_add.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pipe_regs_for(&self, module: &str) -> &[PipeRegDecl] {
        self.pipe_regs_to_add
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
