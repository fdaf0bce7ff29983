//! XMR detection over the elaborated design
//!
//! Walks the instance tree depth-first; for every dotted-name occurrence in
//! a visited module body, asks the frontend to resolve it against the
//! elaborated hierarchy. Occurrences that do not resolve to a signal of the
//! compiled design (struct members, interface accesses, typos) are simply
//! not XMRs. Each distinct reference text per source module yields exactly
//! one `XmrInfo`, even when the module is instantiated several times.

use crate::xmr::{SyntaxHandle, XmrInfo};
use indexmap::IndexSet;
use svbore_frontend::{Design, InstanceNode};
use tracing::debug;

/// Detect every hierarchical reference in the design.
///
/// `modules` filters by source-module definition name; an empty slice keeps
/// all detected references. Output order is instance-tree traversal order,
/// which follows input-file order for the top-level definitions.
pub fn detect_xmrs(design: &Design, modules: &[String]) -> Vec<XmrInfo> {
    let filter: IndexSet<&str> = modules.iter().map(String::as_str).collect();
    let root = design.instance_tree(None);

    let mut seen = IndexSet::new();
    let mut detected = Vec::new();
    let mut ancestors: Vec<&InstanceNode> = vec![&root];
    for child in &root.children {
        visit(design, child, &filter, &mut ancestors, &mut seen, &mut detected);
    }
    detected
}

fn visit<'t>(
    design: &Design,
    node: &'t InstanceNode,
    filter: &IndexSet<&str>,
    ancestors: &mut Vec<&'t InstanceNode>,
    seen: &mut IndexSet<String>,
    detected: &mut Vec<XmrInfo>,
) {
    if let Some((file_idx, def)) = design.module_with_file(&node.module_name) {
        if filter.is_empty() || filter.contains(def.name.as_str()) {
            for occ in &def.occurrences {
                let Some(resolved) = design.resolve_hier_ref(def, ancestors, &occ.text) else {
                    continue;
                };

                // Drop the leading self-reference prefix: `top.u_sub.sig`
                // referenced from `top` keeps only `u_sub`
                let mut path_segments = Vec::with_capacity(resolved.path.len());
                for step in &resolved.path {
                    if path_segments.is_empty() && step.instance_name == node.instance_name {
                        continue;
                    }
                    path_segments.push(step.instance_name.clone());
                }

                // Target module: definition of the last instance kept on the
                // path; collapses to the source for self-references
                let target_module = if path_segments.is_empty() {
                    def.name.clone()
                } else {
                    resolved
                        .path
                        .last()
                        .map(|s| s.module_name.clone())
                        .unwrap_or_else(|| def.name.clone())
                };

                let info = XmrInfo {
                    source_module: def.name.clone(),
                    target_module,
                    target_signal: resolved.target_signal,
                    full_path: occ.text.clone(),
                    path_segments,
                    upward_count: resolved.upward_count,
                    is_upward: resolved.upward_count > 0,
                    is_read: !occ.is_write,
                    is_write: occ.is_write,
                    bit_width: resolved.bit_width,
                    syntax: SyntaxHandle {
                        file: file_idx,
                        start: occ.span.start,
                        end: occ.span.end,
                    },
                };

                if seen.insert(info.unique_id()) {
                    debug!(
                        source = %info.source_module,
                        path = %info.full_path,
                        target = %info.target_module,
                        width = info.bit_width,
                        upward = info.is_upward,
                        write = info.is_write,
                        "detected XMR"
                    );
                    detected.push(info);
                }
            }
        }
    }

    ancestors.push(node);
    for child in &node.children {
        visit(design, child, filter, ancestors, seen, detected);
    }
    ancestors.pop();
}
