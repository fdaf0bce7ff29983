//! Rewrite pass 2: instance connections
//!
//! Runs on the re-parsed output of pass 1 and appends the planned named
//! port bindings to every relevant instantiation. The
//! `(parent, instance, port)` key set makes the pass idempotent: applying
//! it twice adds nothing new.

use crate::edit::{apply_edits, TextEdit};
use crate::error::Result;
use indexmap::IndexSet;
use svbore_engine::ChangeSet;
use svbore_frontend::SourceFile;
use tracing::debug;

/// Connection keys already emitted, shared across every file of a run
pub type ConnectionKeys = IndexSet<(String, String, String)>;

/// Append planned port bindings to the instantiations of one file
pub fn rewrite_instance_connections(
    file: &SourceFile,
    changes: &ChangeSet,
    processed: &mut ConnectionKeys,
) -> Result<String> {
    let mut edits = Vec::new();

    for module in &file.modules {
        for inst in &module.instances {
            let mut added_any = false;
            for conn in &changes.connection_changes {
                if conn.parent_module != module.name
                    || conn.instance_module != inst.module_name
                    || conn.instance_name != inst.instance_name
                {
                    continue;
                }
                let key = (
                    conn.parent_module.clone(),
                    conn.instance_name.clone(),
                    conn.port_name.clone(),
                );
                if !processed.insert(key) {
                    continue;
                }
                // Bindings are always named; a comma separates them from
                // existing connections or ones appended earlier in this pass
                let sep = if inst.connection_count > 0 || added_any {
                    ","
                } else {
                    ""
                };
                edits.push(TextEdit::insert(
                    inst.conn_close_paren,
                    format!("{}\n        .{}({})", sep, conn.port_name, conn.signal_name),
                ));
                added_any = true;
            }
        }
    }

    debug!(file = %file.path, bindings = edits.len(), "instance connection pass");
    apply_edits(&file.text, edits)
}
