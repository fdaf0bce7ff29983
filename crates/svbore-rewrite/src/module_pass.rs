//! Rewrite pass 1: module bodies
//!
//! Injects wires, ports, assigns, and pipeline blocks into each module
//! declaration, and replaces XMR expressions with their planned local
//! names. All edits are span edits against the original text, so
//! everything the plan does not touch survives byte-for-byte.

use crate::edit::{apply_edits, TextEdit};
use crate::error::{Result, RewriteError};
use crate::pipeline::{generate_pipeline_registers, width_spec};
use svbore_engine::naming::{extract_array_suffix, extract_base_path};
use svbore_engine::ChangeSet;
use svbore_frontend::{ModuleDecl, PortListShape, SourceFile};
use tracing::debug;

/// Rewrite every module body in one file, returning the new text
pub fn rewrite_module_bodies(file: &SourceFile, changes: &ChangeSet) -> Result<String> {
    let mut edits = Vec::new();
    for module in &file.modules {
        collect_module_edits(module, changes, &mut edits)?;
    }
    debug!(file = %file.path, edits = edits.len(), "module body pass");
    apply_edits(&file.text, edits)
}

fn collect_module_edits(
    module: &ModuleDecl,
    changes: &ChangeSet,
    edits: &mut Vec<TextEdit>,
) -> Result<()> {
    let ports = changes.ports_for(&module.name);
    let wires = changes.wires_for(&module.name);
    let assigns = changes.assigns_for(&module.name);
    let pipe_regs = changes.pipe_regs_for(&module.name);

    // Port-list augmentation depends on the header's original shape
    match module.port_list {
        PortListShape::Ansi { close_paren, count } => {
            let mut needs_comma = count > 0;
            for port in ports {
                let sep = if needs_comma { "," } else { "" };
                edits.push(TextEdit::insert(
                    close_paren,
                    format!(
                        "{}\n    {} wire {}{}",
                        sep,
                        port.direction.as_str(),
                        width_spec(port.width),
                        port.port_name
                    ),
                ));
                needs_comma = true;
            }
        }
        PortListShape::NonAnsi { close_paren, .. } => {
            for port in ports {
                edits.push(TextEdit::insert(close_paren, format!(", {}", port.port_name)));
                edits.push(TextEdit::insert(
                    module.header_end,
                    format!(
                        "\n    {} wire {}{};",
                        port.direction.as_str(),
                        width_spec(port.width),
                        port.port_name
                    ),
                ));
            }
        }
        PortListShape::None { insert_at } => {
            if !ports.is_empty() {
                // Switch the header to a non-ANSI port list of the new names
                let names: Vec<&str> = ports.iter().map(|p| p.port_name.as_str()).collect();
                edits.push(TextEdit::insert(insert_at, format!("({})", names.join(", "))));
                for port in ports {
                    edits.push(TextEdit::insert(
                        module.header_end,
                        format!(
                            "\n    {} wire {}{};",
                            port.direction.as_str(),
                            width_spec(port.width),
                            port.port_name
                        ),
                    ));
                }
            }
        }
    }

    // Local wires at the front of the member list; a wire that is also
    // being added as a port would be a duplicate declaration
    for wire in wires {
        if ports.iter().any(|p| p.port_name == wire.wire_name) {
            continue;
        }
        edits.push(TextEdit::insert(
            module.header_end,
            format!("\n    wire {}{};", width_spec(wire.width), wire.wire_name),
        ));
    }

    // Assigns, then pipeline blocks, as the last members before endmodule
    if !assigns.is_empty() {
        let mut text = String::from("\n");
        for assign in assigns {
            text.push_str(&format!("    {}\n", assign));
        }
        edits.push(TextEdit::insert(module.endmodule_at, text));
    }
    for decl in pipe_regs {
        let code = generate_pipeline_registers(decl);
        if !code.is_empty() {
            edits.push(TextEdit::insert(module.endmodule_at, format!("\n{}", code)));
        }
    }

    // Expression replacement, token-for-token
    for occ in &module.occurrences {
        let replacement = match changes.replacement(&module.name, &occ.text) {
            Some(r) => r.to_string(),
            None => {
                // Retry on the base path, carrying the select suffix over
                let base = extract_base_path(&occ.text);
                let suffix = extract_array_suffix(&occ.text);
                match changes.replacement(&module.name, &base) {
                    Some(r) => format!("{}{}", extract_base_path(r), suffix),
                    None => continue,
                }
            }
        };
        if !is_valid_expression(&replacement) {
            return Err(RewriteError::InvalidReplacement {
                module: module.name.clone(),
                text: replacement,
            });
        }
        // Leading space: the original expression may sit flush against a
        // preceding operator and the tokens must not fuse
        edits.push(TextEdit::replace(
            occ.span.start,
            occ.span.end,
            format!(" {}", replacement),
        ));
    }

    Ok(())
}

/// Gate on spliced snippets: a replacement must read back as a
/// select-qualified identifier. Outside brackets only identifier characters
/// may appear; brackets must balance and may hold anything.
fn is_valid_expression(text: &str) -> bool {
    let mut depth = 0i32;
    let mut first = true;
    for c in text.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ if depth > 0 => {}
            c if first => {
                if !(c.is_ascii_alphabetic() || c == '_') {
                    return false;
                }
                first = false;
            }
            c => {
                if !(c.is_ascii_alphanumeric() || c == '_' || c == '$') {
                    return false;
                }
            }
        }
    }
    !first && depth == 0
}
