//! svbore rewrite - span edits, rewrite passes, and emission
//!
//! This crate handles:
//! - Applying span edits with byte-faithful round-tripping
//! - Pass 1: module bodies (ports, wires, assigns, pipeline blocks,
//!   expression replacement)
//! - Pass 2: instance port bindings
//! - Pipeline-register block generation
//! - Output markers and the `.work` backup protocol

pub mod edit;
pub mod emit;
pub mod error;
pub mod instance_pass;
pub mod module_pass;
pub mod pipeline;

// Re-export main types
pub use edit::{apply_edits, TextEdit};
pub use emit::{
    backup_file, marker_path, remove_backups, strip_markers, wrap_with_markers, write_output_file,
};
pub use error::RewriteError;
pub use instance_pass::{rewrite_instance_connections, ConnectionKeys};
pub use module_pass::rewrite_module_bodies;
pub use pipeline::{generate_pipeline_registers, width_spec};
