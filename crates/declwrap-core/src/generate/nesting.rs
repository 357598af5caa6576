//! Nesting hierarchy of flattened member names.
//!
//! Members such as `cfg__qp__id` stand for fields of anonymous nested
//! structs. The tree is built once per wrapper so that every interior prefix
//! gets a statically known proxy type.

use super::names::segments;

/// One segment of a flattened member path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<'m> {
    pub segment: &'m str,
    /// Segments from the root down to and including this one.
    pub path: Vec<&'m str>,
    /// Index of the member ending at this node.
    pub leaf: Option<usize>,
    pub children: Vec<Node<'m>>,
}

impl<'m> Node<'m> {
    /// The flattened name this node stands for.
    pub fn flat_name(&self) -> String {
        self.path.join("__")
    }

    /// A prefix only: nested members below, no member of its own.
    pub fn is_interior(&self) -> bool {
        self.leaf.is_none() && !self.children.is_empty()
    }
}

/// Top-level nodes of a wrapper's members, in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestingTree<'m> {
    pub roots: Vec<Node<'m>>,
}

impl<'m> NestingTree<'m> {
    pub fn build(names: &[&'m str]) -> Self {
        let mut tree = Self::default();
        for (index, &name) in names.iter().enumerate() {
            let segs = segments(name);
            let mut level = &mut tree.roots;
            for (depth, &segment) in segs.iter().enumerate() {
                let pos = match level.iter().position(|n| n.segment == segment) {
                    Some(pos) => pos,
                    None => {
                        level.push(Node {
                            segment,
                            path: segs[..=depth].to_vec(),
                            leaf: None,
                            children: Vec::new(),
                        });
                        level.len() - 1
                    }
                };
                let node = &mut level[pos];
                if depth + 1 == segs.len() {
                    node.leaf.get_or_insert(index);
                }
                level = &mut node.children;
            }
        }
        tree
    }

    /// Interior nodes in depth-first order.
    pub fn interior(&self) -> Vec<&Node<'m>> {
        fn walk<'t, 'm>(nodes: &'t [Node<'m>], out: &mut Vec<&'t Node<'m>>) {
            for node in nodes {
                if node.is_interior() {
                    out.push(node);
                }
                walk(&node.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_prefixes() {
        let names = ["a", "cfg__depth", "cfg__qp__id", "cfg__qp__size"];
        let tree = NestingTree::build(&names);
        assert_eq!(tree.roots.len(), 2);
        let interior: Vec<String> = tree.interior().iter().map(|n| n.flat_name()).collect();
        assert_eq!(interior, ["cfg", "cfg__qp"]);

        let cfg = &tree.roots[1];
        assert_eq!(cfg.children[0].leaf, Some(1));
        assert_eq!(cfg.children[1].children[1].leaf, Some(3));
    }

    #[test]
    fn leaf_prefix_is_not_interior() {
        let names = ["cfg", "cfg__depth"];
        let tree = NestingTree::build(&names);
        assert!(tree.interior().is_empty());
        assert_eq!(tree.roots[0].leaf, Some(0));
    }

    #[test]
    fn proxy_depth_matches_segment_count() {
        let names = ["x__y__z__w"];
        let tree = NestingTree::build(&names);
        let interior = tree.interior();
        assert_eq!(interior.len(), 3);
        assert_eq!(interior[2].path, ["x", "y", "z"]);
    }
}
