//! Elaborated design: definition table, instance tree, name resolution
//!
//! The design owns every parsed source file and exposes the surface the
//! XMR engine consumes: module definitions by name, the elaborated instance
//! tree rooted at a synthetic node whose children are the top-level
//! instances, and hierarchical-name resolution with the resolver path,
//! upward count, and target-symbol width.

use crate::ast::{ModuleDecl, SourceFile};
use crate::error::{FrontendError, Result};
use indexmap::{IndexMap, IndexSet};

/// A fully loaded and indexed design
#[derive(Debug)]
pub struct Design {
    pub files: Vec<SourceFile>,
    /// Module name -> (file index, module index); definition names are
    /// globally unique
    defs: IndexMap<String, (usize, usize)>,
}

/// One node of the elaborated instance tree
///
/// The root is synthetic (`instance_name` and `module_name` empty); its
/// children are the top-level instances, whose instance name equals their
/// module name.
#[derive(Debug, Clone)]
pub struct InstanceNode {
    pub instance_name: String,
    pub module_name: String,
    pub children: Vec<InstanceNode>,
}

impl InstanceNode {
    pub fn is_root(&self) -> bool {
        self.instance_name.is_empty()
    }

    pub fn child(&self, instance_name: &str) -> Option<&InstanceNode> {
        self.children.iter().find(|c| c.instance_name == instance_name)
    }
}

/// One step of a resolved hierarchical path: an instance symbol
#[derive(Debug, Clone)]
pub struct PathStep {
    pub instance_name: String,
    pub module_name: String,
}

/// A hierarchical reference resolved against the elaborated design
#[derive(Debug, Clone)]
pub struct ResolvedRef {
    /// Instance symbols walked by the resolver, in traversal order. For a
    /// downward reference this starts at a child of the source module; for
    /// an upward reference it starts at the scope the lookup climbed to.
    pub path: Vec<PathStep>,
    /// Lexical scope levels climbed before descending; 0 for purely
    /// downward references
    pub upward_count: u32,
    pub target_signal: String,
    /// Definition name of the module owning the target signal
    pub target_module: String,
    /// Declared width of the target symbol (not of any select applied to it)
    pub bit_width: u32,
}

impl Design {
    pub fn new(files: Vec<SourceFile>) -> Result<Self> {
        let mut defs: IndexMap<String, (usize, usize)> = IndexMap::new();
        for (fi, file) in files.iter().enumerate() {
            for (mi, module) in file.modules.iter().enumerate() {
                if let Some(&(prev_fi, _)) = defs.get(&module.name) {
                    return Err(FrontendError::DuplicateModule {
                        name: module.name.clone(),
                        first: files[prev_fi].path.clone(),
                        second: file.path.clone(),
                    });
                }
                defs.insert(module.name.clone(), (fi, mi));
            }
        }
        Ok(Design { files, defs })
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDecl> {
        self.defs
            .get(name)
            .map(|&(fi, mi)| &self.files[fi].modules[mi])
    }

    /// Module definition together with the index of its owning file
    pub fn module_with_file(&self, name: &str) -> Option<(usize, &ModuleDecl)> {
        self.defs
            .get(name)
            .map(|&(fi, mi)| (fi, &self.files[fi].modules[mi]))
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleDecl> {
        self.defs
            .values()
            .map(move |&(fi, mi)| &self.files[fi].modules[mi])
    }

    /// Module-definition names instantiated by nothing in the design, in
    /// definition order
    pub fn top_module_names(&self) -> Vec<String> {
        let mut instantiated: IndexSet<&str> = IndexSet::new();
        for module in self.modules() {
            for inst in &module.instances {
                instantiated.insert(inst.module_name.as_str());
            }
        }
        self.defs
            .keys()
            .filter(|name| !instantiated.contains(name.as_str()))
            .cloned()
            .collect()
    }

    /// Build the elaborated instance tree.
    ///
    /// `top` restricts the root to a single named top module; otherwise all
    /// detected top modules become root children. Instantiation cycles are
    /// broken by pruning the re-entered definition.
    pub fn instance_tree(&self, top: Option<&str>) -> InstanceNode {
        let tops: Vec<String> = match top {
            Some(name) if self.defs.contains_key(name) => vec![name.to_string()],
            _ => self.top_module_names(),
        };

        let mut active = IndexSet::new();
        let children = tops
            .iter()
            .map(|name| self.build_node(name, name, &mut active))
            .collect();

        InstanceNode {
            instance_name: String::new(),
            module_name: String::new(),
            children,
        }
    }

    fn build_node(
        &self,
        instance_name: &str,
        module_name: &str,
        active: &mut IndexSet<String>,
    ) -> InstanceNode {
        let mut node = InstanceNode {
            instance_name: instance_name.to_string(),
            module_name: module_name.to_string(),
            children: Vec::new(),
        };
        if !active.insert(module_name.to_string()) {
            return node;
        }
        if let Some(def) = self.module(module_name) {
            for inst in &def.instances {
                if self.module(&inst.module_name).is_some() {
                    node.children.push(self.build_node(
                        &inst.instance_name,
                        &inst.module_name,
                        active,
                    ));
                }
            }
        }
        active.shift_remove(module_name);
        node
    }

    /// Resolve a dotted reference text occurring in `source`, elaborated at
    /// the instance whose ancestor chain (root first, parent last, the
    /// instance itself excluded) is `ancestors`.
    ///
    /// Returns `None` when the text does not name a signal of the compiled
    /// design (e.g. a struct member access), which simply means the
    /// occurrence is not an XMR.
    pub fn resolve_hier_ref(
        &self,
        source: &ModuleDecl,
        ancestors: &[&InstanceNode],
        text: &str,
    ) -> Option<ResolvedRef> {
        let base = strip_selects(text);
        let segments: Vec<&str> = base.split('.').map(str::trim).collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        let (instance_segs, signal) = segments.split_at(segments.len() - 1);
        let signal = signal[0];

        // Downward: the first segment names a child instance of the source
        if let Some(resolved) = self.resolve_downward(source, instance_segs, signal) {
            return Some(resolved);
        }

        // Upward: climb the ancestor chain looking for a scope that either
        // contains a child instance named like the first segment or is
        // itself named like it
        let first = instance_segs[0];
        for (level, scope) in ancestors.iter().rev().enumerate() {
            let scope: &InstanceNode = scope;
            let upward_count = (level + 1) as u32;
            let entry = if let Some(child) = scope.child(first) {
                child
            } else if scope.instance_name == first {
                scope
            } else {
                continue;
            };

            let mut path = vec![PathStep {
                instance_name: entry.instance_name.clone(),
                module_name: entry.module_name.clone(),
            }];
            let mut def = self.module(&entry.module_name)?;
            for seg in &instance_segs[1..] {
                let child_module = def.instance_module(seg)?;
                path.push(PathStep {
                    instance_name: (*seg).to_string(),
                    module_name: child_module.to_string(),
                });
                def = self.module(child_module)?;
            }
            let bit_width = def.signal_width(signal)?;
            return Some(ResolvedRef {
                path,
                upward_count,
                target_signal: signal.to_string(),
                target_module: def.name.clone(),
                bit_width,
            });
        }

        None
    }

    fn resolve_downward(
        &self,
        source: &ModuleDecl,
        instance_segs: &[&str],
        signal: &str,
    ) -> Option<ResolvedRef> {
        let mut path = Vec::with_capacity(instance_segs.len());
        let mut def = source;
        for seg in instance_segs {
            let child_module = def.instance_module(seg)?;
            path.push(PathStep {
                instance_name: (*seg).to_string(),
                module_name: child_module.to_string(),
            });
            def = self.module(child_module)?;
        }
        let bit_width = def.signal_width(signal)?;
        Some(ResolvedRef {
            path,
            upward_count: 0,
            target_signal: signal.to_string(),
            target_module: def.name.clone(),
            bit_width,
        })
    }
}

/// Drop every bracketed select, keeping the identifier backbone
fn strip_selects(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_file;

    fn design(sources: &[&str]) -> Design {
        let mut defines = IndexSet::new();
        let files = sources
            .iter()
            .enumerate()
            .map(|(i, s)| parse_file(&format!("f{i}.sv"), s.to_string(), &mut defines).unwrap())
            .collect();
        Design::new(files).unwrap()
    }

    #[test]
    fn top_modules_are_uninstantiated_defs() {
        let d = design(&["module top; sub u_sub(); endmodule module sub; endmodule"]);
        assert_eq!(d.top_module_names(), vec!["top".to_string()]);
    }

    #[test]
    fn instance_tree_roots_top_level_instances() {
        let d = design(&[
            "module top; mid u_mid(); endmodule",
            "module mid; leaf u_leaf(); endmodule module leaf; endmodule",
        ]);
        let root = d.instance_tree(None);
        assert!(root.is_root());
        assert_eq!(root.children.len(), 1);
        let top = &root.children[0];
        assert_eq!(top.instance_name, "top");
        assert_eq!(top.children[0].instance_name, "u_mid");
        assert_eq!(top.children[0].children[0].module_name, "leaf");
    }

    #[test]
    fn duplicate_definitions_are_rejected() {
        let mut defines = IndexSet::new();
        let a = parse_file("a.sv", "module m; endmodule".into(), &mut defines).unwrap();
        let b = parse_file("b.sv", "module m; endmodule".into(), &mut defines).unwrap();
        assert!(matches!(
            Design::new(vec![a, b]),
            Err(FrontendError::DuplicateModule { .. })
        ));
    }

    #[test]
    fn resolves_downward_reference() {
        let d = design(&[
            "module top; sub u_sub(); assign y = u_sub.sig; endmodule",
            "module sub; reg [7:0] sig; endmodule",
        ]);
        let root = d.instance_tree(None);
        let r = d
            .resolve_hier_ref(d.module("top").unwrap(), &[&root], "u_sub.sig")
            .unwrap();
        assert_eq!(r.upward_count, 0);
        assert_eq!(r.target_module, "sub");
        assert_eq!(r.bit_width, 8);
        assert_eq!(r.path.len(), 1);
        assert_eq!(r.path[0].instance_name, "u_sub");
    }

    #[test]
    fn resolves_upward_reference_from_sibling() {
        let d = design(&[
            "module tb_top; dut uut(); others other_inst(); endmodule",
            "module dut; reg [3:0] counter; endmodule",
            "module others; endmodule",
        ]);
        let root = d.instance_tree(None);
        let tb = &root.children[0];
        let r = d
            .resolve_hier_ref(
                d.module("others").unwrap(),
                &[&root, tb],
                "tb_top.uut.counter",
            )
            .unwrap();
        assert_eq!(r.upward_count, 1);
        assert_eq!(r.target_module, "dut");
        assert_eq!(r.bit_width, 4);
        let names: Vec<&str> = r.path.iter().map(|p| p.instance_name.as_str()).collect();
        assert_eq!(names, vec!["tb_top", "uut"]);
    }

    #[test]
    fn resolves_self_qualified_reference() {
        let d = design(&["module top; reg clock; endmodule"]);
        let root = d.instance_tree(None);
        let r = d
            .resolve_hier_ref(d.module("top").unwrap(), &[&root], "top.clock")
            .unwrap();
        assert_eq!(r.upward_count, 1);
        assert_eq!(r.path.len(), 1);
        assert_eq!(r.path[0].instance_name, "top");
        assert_eq!(r.target_module, "top");
    }

    #[test]
    fn struct_member_access_is_not_an_xmr() {
        let d = design(&["module top; assign y = some_struct.field; endmodule"]);
        let root = d.instance_tree(None);
        assert!(d
            .resolve_hier_ref(d.module("top").unwrap(), &[&root], "some_struct.field")
            .is_none());
    }

    #[test]
    fn select_on_segment_resolves_by_base_path() {
        let d = design(&[
            "module top; sub u_sub(); assign y = u_sub.arr[3]; endmodule",
            "module sub; reg [7:0] arr; endmodule",
        ]);
        let root = d.instance_tree(None);
        let r = d
            .resolve_hier_ref(d.module("top").unwrap(), &[&root], "u_sub.arr[3]")
            .unwrap();
        assert_eq!(r.bit_width, 8);
        assert_eq!(r.target_signal, "arr");
    }
}
