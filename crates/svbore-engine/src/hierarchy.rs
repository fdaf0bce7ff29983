//! Instance map and path finder over the elaborated instance tree

use indexmap::IndexMap;
use svbore_frontend::InstanceNode;

/// `(parent module definition, instance name) -> child module definition`
pub type InstanceMap = IndexMap<(String, String), String>;

/// One traversal of the instance tree recording every non-root edge.
///
/// Top-level instances hang off the synthetic root and have no parent
/// definition, so they do not appear as values' keys here; upward routing
/// falls back to treating their instance name as their module name.
pub fn build_instance_map(root: &InstanceNode) -> InstanceMap {
    let mut map = InstanceMap::new();
    fn walk(node: &InstanceNode, map: &mut InstanceMap) {
        for child in &node.children {
            if !node.is_root() {
                map.insert(
                    (node.module_name.clone(), child.instance_name.clone()),
                    child.module_name.clone(),
                );
            }
            walk(child, map);
        }
    }
    walk(root, &mut map);
    map
}

/// Every root-to-instance path (as instance names) whose final node has the
/// given module definition.
///
/// When the same module is instantiated more than once, several paths come
/// back; callers use the first, which follows tree order.
pub fn find_instance_paths(root: &InstanceNode, target_module: &str) -> Vec<Vec<String>> {
    let mut found = Vec::new();
    let mut current = Vec::new();
    fn walk(
        node: &InstanceNode,
        target: &str,
        current: &mut Vec<String>,
        found: &mut Vec<Vec<String>>,
    ) {
        for child in &node.children {
            current.push(child.instance_name.clone());
            if child.module_name == target {
                found.push(current.clone());
            }
            walk(child, target, current, found);
            current.pop();
        }
    }
    walk(root, target_module, &mut current, &mut found);
    found
}

/// Module definition reached by walking `path` (instance names) down from
/// the root; top-level instances resolve to their own name
pub fn module_of_path(map: &InstanceMap, path: &[String]) -> Option<String> {
    let mut current = path.first()?.clone();
    for segment in &path[1..] {
        current = map.get(&(current, segment.clone()))?.clone();
    }
    Some(current)
}
