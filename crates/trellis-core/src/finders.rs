//! Searches over the build tree. Every finder considers the starting node
//! itself first.

use crate::component::ComponentType;
use crate::node::AppNode;

pub fn find_ancestor(node: &AppNode, mut predicate: impl FnMut(&AppNode) -> bool) -> Option<AppNode> {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if predicate(&candidate) {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}

/// Depth-first, in child order.
pub fn find_descendant(root: &AppNode, mut predicate: impl FnMut(&AppNode) -> bool) -> Option<AppNode> {
    find_descendant_dyn(root, &mut predicate)
}

fn find_descendant_dyn(root: &AppNode, predicate: &mut dyn FnMut(&AppNode) -> bool) -> Option<AppNode> {
    if predicate(root) {
        return Some(root.clone());
    }
    root.children()
        .into_iter()
        .flatten()
        .find_map(|child| find_descendant_dyn(&child, predicate))
}

pub fn find_descendant_of_type(root: &AppNode, ty: ComponentType) -> Option<AppNode> {
    find_descendant(root, |node| node.component_type() == Some(ty))
}

/// Matches on the component's debug name, which need not be unique.
pub fn find_descendant_by_name(root: &AppNode, name: &str) -> Option<AppNode> {
    find_descendant(root, |node| node.component_type().is_some_and(|ty| ty.name() == name))
}

pub fn find_descendants_of_type(root: &AppNode, ty: ComponentType) -> Vec<AppNode> {
    let mut found = Vec::new();
    collect_of_type(root, ty, &mut found);
    found
}

fn collect_of_type(node: &AppNode, ty: ComponentType, found: &mut Vec<AppNode>) {
    if node.component_type() == Some(ty) {
        found.push(node.clone());
    }
    for child in node.children().into_iter().flatten() {
        collect_of_type(&child, ty, found);
    }
}
