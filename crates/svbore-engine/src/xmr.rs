//! Detected XMR references

use crate::naming::generate_port_name;
use serde::{Deserialize, Serialize};

/// Handle back to the original expression syntax: owning file index within
/// the design plus the byte span of the reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxHandle {
    pub file: usize,
    pub start: usize,
    pub end: usize,
}

/// One detected hierarchical (cross-module) reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmrInfo {
    /// Definition name of the module where the reference textually occurs
    pub source_module: String,
    /// Definition name of the module owning the target signal
    pub target_module: String,
    /// The referenced identifier (last element of the path)
    pub target_signal: String,
    /// Exact surface text of the reference, array suffixes included
    pub full_path: String,
    /// Instance names walked from source to target; never contains the
    /// target signal or the source module's self name. Empty exactly for
    /// self-references.
    pub path_segments: Vec<String>,
    /// Lexical scope levels the resolver climbed before descending
    pub upward_count: u32,
    /// `upward_count > 0`
    pub is_upward: bool,
    pub is_read: bool,
    pub is_write: bool,
    /// Width of the target symbol (not of the sliced expression)
    pub bit_width: u32,
    #[serde(skip)]
    pub syntax: SyntaxHandle,
}

impl XmrInfo {
    /// Deduplication key: one entry per distinct reference text per module
    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.source_module, self.full_path)
    }

    /// Port name synthesized from the full reference text
    pub fn port_name(&self) -> String {
        generate_port_name(&self.full_path)
    }

    /// Self-references route nothing; only the expression text changes
    pub fn is_self_reference(&self) -> bool {
        self.path_segments.is_empty()
    }
}
