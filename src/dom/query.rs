//! Selector-driven walks over the owned tree
//!
//! The tree has no parent pointers, so every walk carries an explicit stack
//! of ancestor element snapshots for upward matching (descendant and child
//! combinators, contextual compatibility passes).

use super::{ElementData, Node, NodeData};
use crate::css::selector::Selector;

/// Apply `f` to the element data of every node the selector matches
pub fn for_each_match(root: &mut Node, selector: &Selector, f: &mut impl FnMut(&mut ElementData)) {
    let mut ancestors = Vec::new();
    match_walk(root, selector, &mut ancestors, f);
}

fn match_walk(
    node: &mut Node,
    selector: &Selector,
    ancestors: &mut Vec<ElementData>,
    f: &mut impl FnMut(&mut ElementData),
) {
    if let NodeData::Element(data) = &mut node.data {
        if selector.matches(data, ancestors) {
            f(data);
        }
        ancestors.push(data.clone());
        for child in &mut node.children {
            match_walk(child, selector, ancestors, f);
        }
        ancestors.pop();
    } else {
        for child in &mut node.children {
            match_walk(child, selector, ancestors, f);
        }
    }
}

/// Visit every element node with its ancestor snapshots, mutably
pub fn walk_elements(root: &mut Node, f: &mut impl FnMut(&mut Node, &[ElementData])) {
    let mut ancestors = Vec::new();
    element_walk(root, &mut ancestors, f);
}

fn element_walk(
    node: &mut Node,
    ancestors: &mut Vec<ElementData>,
    f: &mut impl FnMut(&mut Node, &[ElementData]),
) {
    let snapshot = if node.is_element() {
        f(node, ancestors);
        // Snapshot after f so descendants see applied changes
        node.as_element().cloned()
    } else {
        None
    };
    if let Some(data) = snapshot {
        ancestors.push(data);
        for child in &mut node.children {
            element_walk(child, ancestors, f);
        }
        ancestors.pop();
    } else {
        for child in &mut node.children {
            element_walk(child, ancestors, f);
        }
    }
}

/// First node (document order) the selector matches
pub fn find_first<'a>(root: &'a mut Node, selector: &Selector) -> Option<&'a mut Node> {
    let mut ancestors = Vec::new();
    find_walk(root, selector, &mut ancestors)
}

fn find_walk<'a>(
    node: &'a mut Node,
    selector: &Selector,
    ancestors: &mut Vec<ElementData>,
) -> Option<&'a mut Node> {
    if node
        .as_element()
        .is_some_and(|data| selector.matches(data, ancestors))
    {
        return Some(node);
    }
    let snapshot = node.as_element().cloned();
    let pushed = snapshot.is_some();
    if let Some(data) = snapshot {
        ancestors.push(data);
    }
    for child in &mut node.children {
        if let Some(found) = find_walk(child, selector, ancestors) {
            return Some(found);
        }
    }
    if pushed {
        ancestors.pop();
    }
    None
}

/// Count matches without mutating anything
pub fn count_matches(root: &Node, selector: &Selector) -> usize {
    let mut count = 0;
    let mut ancestors = Vec::new();
    count_walk(root, selector, &mut ancestors, &mut count);
    count
}

fn count_walk(node: &Node, selector: &Selector, ancestors: &mut Vec<ElementData>, count: &mut usize) {
    if let NodeData::Element(data) = &node.data {
        if selector.matches(data, ancestors) {
            *count += 1;
        }
        ancestors.push(data.clone());
        for child in &node.children {
            count_walk(child, selector, ancestors, count);
        }
        ancestors.pop();
    } else {
        for child in &node.children {
            count_walk(child, selector, ancestors, count);
        }
    }
}
