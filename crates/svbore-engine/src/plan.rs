//! Change planning
//!
//! Consumes the detected XMR list and produces the total `ChangeSet`:
//! ports, wires, assigns, instance connections, pipeline registers, and the
//! expression replacement map. Two reference shapes exist:
//!
//! 1. **Downward** (relative path, e.g. `u_mid.u_bottom.sig` from `top`):
//!    the signal flows up through output ports for reads, or down through
//!    input ports for writes.
//!
//!    ```text
//!    top       (source)        wire + instance connection
//!    mid       (intermediate)  pass-through port + connection
//!    bottom    (target)        port + assign
//!    ```
//!
//! 2. **Upward** (absolute path, e.g. `tb_top.uut.counter` from a sibling):
//!    the source grows an input port fed from a wire in its parent, and the
//!    signal is exported up from its owner along the absolute path.
//!
//! The planner is pure: it mutates neither the design nor the filesystem,
//! and the first occurrence of each reference key wins, so a deterministic
//! detector order yields a deterministic plan.

use crate::changeset::{
    ChangeSet, ConnectionChange, Direction, PipeRegDecl, PortChange, WireDecl,
};
use crate::config::PlanConfig;
use crate::error::PlanError;
use crate::hierarchy::{build_instance_map, find_instance_paths, module_of_path, InstanceMap};
use crate::naming::{extract_array_suffix, extract_base_path, generate_port_name};
use crate::xmr::XmrInfo;
use indexmap::IndexSet;
use svbore_frontend::InstanceNode;
use tracing::debug;

/// Output of the planner: the plan itself plus the references it had to
/// drop because the hierarchy disagreed with the detected path
#[derive(Debug, Default)]
pub struct PlanOutcome {
    pub changes: ChangeSet,
    pub errors: Vec<PlanError>,
}

/// Compute every change needed to eliminate the given XMRs
pub fn compute_changes(
    xmrs: &[XmrInfo],
    root: &InstanceNode,
    config: &PlanConfig,
) -> PlanOutcome {
    let map = build_instance_map(root);
    let mut out = PlanOutcome::default();
    let mut processed: IndexSet<String> = IndexSet::new();
    let mut processed_base: IndexSet<String> = IndexSet::new();

    for xmr in xmrs {
        if !processed.insert(xmr.unique_id()) {
            continue;
        }

        // Self-reference: the qualified name collapses to the local signal,
        // nothing is routed
        if xmr.is_self_reference() {
            out.changes.xmr_replacements.insert(
                (xmr.source_module.clone(), xmr.full_path.clone()),
                xmr.target_signal.clone(),
            );
            continue;
        }

        let base_path = extract_base_path(&xmr.full_path);
        let array_suffix = extract_array_suffix(&xmr.full_path);
        let port_name = generate_port_name(&base_path);

        out.changes.xmr_replacements.insert(
            (xmr.source_module.clone(), xmr.full_path.clone()),
            format!("{}{}", port_name, array_suffix),
        );

        // Several selects of one signal share a single port chain
        if !processed_base.insert(format!("{}::{}", xmr.source_module, base_path)) {
            continue;
        }

        debug!(
            source = %xmr.source_module,
            path = %xmr.full_path,
            port = %port_name,
            "routing XMR"
        );

        let result = if xmr.is_upward {
            plan_upward(xmr, &port_name, root, &map, &mut out.changes)
        } else {
            plan_downward(xmr, &port_name, &map, config, &mut out.changes)
        };
        if let Err(e) = result {
            // The reference is dropped wholesale: keeping the substitution
            // without its routing would leave an undriven name behind
            out.changes
                .xmr_replacements
                .shift_remove(&(xmr.source_module.clone(), xmr.full_path.clone()));
            out.errors.push(e);
        }
    }

    dedup(&mut out.changes);
    out
}

/// Resolve the full hop list up front so a missing instance-map entry
/// leaves no partial routing behind
fn resolve_hops(
    start_module: &str,
    segments: &[String],
    map: &InstanceMap,
    full_path: &str,
) -> Result<Vec<(String, String, String)>, PlanError> {
    let mut hops = Vec::with_capacity(segments.len());
    let mut current = start_module.to_string();
    for segment in segments {
        match map.get(&(current.clone(), segment.clone())) {
            Some(child) => {
                hops.push((current.clone(), segment.clone(), child.clone()));
                current = child.clone();
            }
            None => {
                return Err(PlanError::MissingInstance {
                    module: current,
                    instance: segment.clone(),
                    path: full_path.to_string(),
                })
            }
        }
    }
    Ok(hops)
}

fn plan_downward(
    xmr: &XmrInfo,
    port_name: &str,
    map: &InstanceMap,
    config: &PlanConfig,
    changes: &mut ChangeSet,
) -> Result<(), PlanError> {
    let hops = resolve_hops(&xmr.source_module, &xmr.path_segments, map, &xmr.full_path)?;

    // Local wire in the source module, bound to the child's new port
    changes
        .wires_to_add
        .entry(xmr.source_module.clone())
        .or_default()
        .push(WireDecl {
            wire_name: port_name.to_string(),
            width: xmr.bit_width,
        });

    let last = hops.len() - 1;
    for (i, (parent, instance, child)) in hops.iter().enumerate() {
        changes.connection_changes.push(ConnectionChange {
            parent_module: parent.clone(),
            instance_name: instance.clone(),
            instance_module: child.clone(),
            port_name: port_name.to_string(),
            signal_name: port_name.to_string(),
        });
        if i < last {
            // Pass-through: reads flow up (output), writes flow down (input)
            changes
                .ports_to_add
                .entry(child.clone())
                .or_default()
                .push(PortChange {
                    port_name: port_name.to_string(),
                    direction: if xmr.is_write {
                        Direction::Input
                    } else {
                        Direction::Output
                    },
                    width: xmr.bit_width,
                    signal_to_assign: None,
                });
        }
    }

    let stages = config
        .pipe_regs
        .get(&xmr.source_module)
        .map(|cfg| cfg.stages_for(xmr.path_segments.len(), port_name, &xmr.target_signal))
        .unwrap_or(0);

    // Terminal port and assign on the signal-owning module
    let target = &xmr.target_module;
    changes
        .ports_to_add
        .entry(target.clone())
        .or_default()
        .push(PortChange {
            port_name: port_name.to_string(),
            direction: if xmr.is_write {
                Direction::Input
            } else {
                Direction::Output
            },
            width: xmr.bit_width,
            signal_to_assign: Some(xmr.target_signal.clone()),
        });

    if stages > 0 {
        // The final pipeline stage drives the port (or, for writes, the
        // signal); the direct assign is omitted
        let (input_signal, output_signal) = if xmr.is_write {
            (port_name.to_string(), xmr.target_signal.clone())
        } else {
            (xmr.target_signal.clone(), port_name.to_string())
        };
        changes
            .pipe_regs_to_add
            .entry(target.clone())
            .or_default()
            .push(PipeRegDecl {
                input_signal,
                output_signal,
                width: xmr.bit_width,
                stages,
                clock: config.clock_name.clone(),
                reset: config.reset_name.clone(),
                reset_active_low: config.reset_active_low,
            });
    } else if xmr.is_write {
        changes
            .assigns_to_add
            .entry(target.clone())
            .or_default()
            .push(format!("assign {} = {};", xmr.target_signal, port_name));
    } else {
        changes
            .assigns_to_add
            .entry(target.clone())
            .or_default()
            .push(format!("assign {} = {};", port_name, xmr.target_signal));
    }

    Ok(())
}

fn plan_upward(
    xmr: &XmrInfo,
    port_name: &str,
    root: &InstanceNode,
    map: &InstanceMap,
    changes: &mut ChangeSet,
) -> Result<(), PlanError> {
    let root_segment = &xmr.path_segments[0];

    // Module definition behind the first path segment. Top-level instances
    // are not in the map; their instance name doubles as the module name.
    let first_def = map
        .iter()
        .find(|((_, instance), _)| instance == root_segment)
        .map(|(_, def)| def.clone())
        .unwrap_or_else(|| root_segment.clone());

    // Validate the descent before committing anything
    let hops = resolve_hops(&first_def, &xmr.path_segments[1..], map, &xmr.full_path)?;

    // The source module consumes the signal through a new input port
    changes
        .ports_to_add
        .entry(xmr.source_module.clone())
        .or_default()
        .push(PortChange {
            port_name: port_name.to_string(),
            direction: Direction::Input,
            width: xmr.bit_width,
            signal_to_assign: None,
        });

    // Feed that port from a wire in the source instance's immediate parent
    let paths = find_instance_paths(root, &xmr.source_module);
    if let Some(path) = paths.first() {
        if path.len() >= 2 {
            let parent_module = module_of_path(map, &path[..path.len() - 1])
                .unwrap_or_else(|| first_def.clone());
            let source_instance = path[path.len() - 1].clone();
            changes
                .wires_to_add
                .entry(parent_module.clone())
                .or_default()
                .push(WireDecl {
                    wire_name: port_name.to_string(),
                    width: xmr.bit_width,
                });
            changes.connection_changes.push(ConnectionChange {
                parent_module,
                instance_name: source_instance,
                instance_module: xmr.source_module.clone(),
                port_name: port_name.to_string(),
                signal_name: port_name.to_string(),
            });
        }
    }

    // Export the signal up the absolute path with output ports
    for (parent, instance, child) in &hops {
        changes.connection_changes.push(ConnectionChange {
            parent_module: parent.clone(),
            instance_name: instance.clone(),
            instance_module: child.clone(),
            port_name: port_name.to_string(),
            signal_name: port_name.to_string(),
        });
        changes
            .ports_to_add
            .entry(child.clone())
            .or_default()
            .push(PortChange {
                port_name: port_name.to_string(),
                direction: Direction::Output,
                width: xmr.bit_width,
                signal_to_assign: None,
            });
    }

    // Assign in the signal-owning module
    if !xmr.target_module.is_empty() {
        changes
            .assigns_to_add
            .entry(xmr.target_module.clone())
            .or_default()
            .push(format!("assign {} = {};", port_name, xmr.target_signal));
    }

    Ok(())
}

/// Collapse duplicates: ports on `(name, direction)` per module, wires on
/// name, connections on `(parent, instance, port)`, pipeline registers on
/// output signal
fn dedup(changes: &mut ChangeSet) {
    for ports in changes.ports_to_add.values_mut() {
        let mut seen = IndexSet::new();
        ports.retain(|p| seen.insert((p.port_name.clone(), p.direction)));
    }
    for wires in changes.wires_to_add.values_mut() {
        let mut seen = IndexSet::new();
        wires.retain(|w| seen.insert(w.wire_name.clone()));
    }
    {
        let mut seen = IndexSet::new();
        changes.connection_changes.retain(|c| {
            seen.insert((
                c.parent_module.clone(),
                c.instance_name.clone(),
                c.port_name.clone(),
            ))
        });
    }
    for regs in changes.pipe_regs_to_add.values_mut() {
        let mut seen = IndexSet::new();
        regs.retain(|r| seen.insert(r.output_signal.clone()));
    }
}
