//! svbore engine - XMR detection, planning, and verification
//!
//! This crate handles:
//! - Port-name synthesis and path utilities
//! - Walking the elaborated design to detect hierarchical references
//! - The instance map and root-to-instance path finder
//! - Computing the `ChangeSet` consumed by the rewriter
//! - Clock/reset verification for pipeline-register requests

pub mod changeset;
pub mod config;
pub mod detect;
pub mod error;
pub mod hierarchy;
pub mod naming;
pub mod plan;
pub mod verify;
pub mod xmr;

// Re-export main types
pub use changeset::{
    ChangeSet, ConnectionChange, Direction, PipeRegDecl, PortChange, WireDecl,
};
pub use config::{PipeRegConfig, PipeRegEntry, PipeRegMode, PlanConfig};
pub use detect::detect_xmrs;
pub use error::PlanError;
pub use hierarchy::{build_instance_map, find_instance_paths, InstanceMap};
pub use naming::{extract_array_suffix, extract_base_path, generate_port_name};
pub use plan::{compute_changes, PlanOutcome};
pub use verify::verify_clock_reset;
pub use xmr::{SyntaxHandle, XmrInfo};
