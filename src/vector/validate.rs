//! Structural consistency checking, used by the test suites after
//! interesting mutations. A correct implementation never trips these; the
//! diagnostics exist to catch regressions close to their cause instead of
//! as misindexed reads three operations later.

use crate::config::{BITS, MAX_HEIGHT};
use crate::error::Error;

use super::node::Node;
use super::Vector;

impl<T> Vector<T> {
    /// Walks the whole tree checking the shape invariants: subtree sizes
    /// against size tables or the radix formula, fullness of non-final
    /// children of regular nodes, leaf depth, root collapse, and the tail
    /// discipline. Returns [`Error::InvariantViolated`] with a diagnostic
    /// on the first mismatch.
    pub fn validate(&self) -> Result<(), Error> {
        if self.shift % BITS != 0 {
            return Err(violation(format!(
                "shift {} is not a multiple of {}",
                self.shift, BITS
            )));
        }
        if self.shift >= MAX_HEIGHT * BITS {
            return Err(violation(format!(
                "shift {} exceeds the addressable height",
                self.shift
            )));
        }
        let tree_size = match &self.root {
            None => {
                if self.shift != 0 {
                    return Err(violation(format!(
                        "rootless vector carries shift {}",
                        self.shift
                    )));
                }
                0
            }
            Some(root) => validate_node(root, self.shift, true)?,
        };

        #[cfg(feature = "tail")]
        {
            let tail_len = self.tail.elems.len();
            if tree_size + tail_len != self.len {
                return Err(violation(format!(
                    "tree holds {} and tail {} elements, but the count is {}",
                    tree_size, tail_len, self.len
                )));
            }
            if self.len > 0 && tail_len == 0 {
                return Err(violation("non-empty vector with an empty tail".into()));
            }
        }
        #[cfg(not(feature = "tail"))]
        {
            if tree_size != self.len {
                return Err(violation(format!(
                    "tree holds {} elements, but the count is {}",
                    tree_size, self.len
                )));
            }
        }
        Ok(())
    }
}

fn violation(detail: String) -> Error {
    Error::InvariantViolated(detail)
}

/// Checks the subtree at `shift` and returns its element count.
fn validate_node<T>(node: &Node<T>, shift: usize, is_root: bool) -> Result<usize, Error> {
    match node {
        Node::Leaf(leaf) => {
            if shift != 0 {
                return Err(violation(format!("leaf at shift {}", shift)));
            }
            if leaf.elems.is_empty() {
                return Err(violation("empty leaf".into()));
            }
            Ok(leaf.elems.len())
        }
        Node::Internal(internal) => {
            if shift == 0 {
                return Err(violation("internal node at leaf level".into()));
            }
            if internal.children.is_empty() {
                return Err(violation("internal node without children".into()));
            }
            if is_root && internal.children.len() == 1 {
                return Err(violation("root with a single child".into()));
            }
            match &internal.sizes {
                Some(sizes) => {
                    if sizes.len() != internal.children.len() {
                        return Err(violation(format!(
                            "size table has {} entries for {} children",
                            sizes.len(),
                            internal.children.len()
                        )));
                    }
                    let mut total = 0;
                    for (i, child) in internal.children.iter().enumerate() {
                        total += validate_node(child, shift - BITS, false)?;
                        if sizes[i] != total {
                            return Err(violation(format!(
                                "size table entry {} is {}, but the children sum to {}",
                                i, sizes[i], total
                            )));
                        }
                    }
                    Ok(total)
                }
                None => {
                    let full = 1 << shift;
                    let mut total = 0;
                    for (i, child) in internal.children.iter().enumerate() {
                        if let Node::Internal(grandchild) = child.as_ref() {
                            if grandchild.sizes.is_some() {
                                return Err(violation(format!(
                                    "relaxed child {} under a regular node at shift {}",
                                    i, shift
                                )));
                            }
                        }
                        let sub = validate_node(child, shift - BITS, false)?;
                        if i + 1 < internal.children.len() && sub != full {
                            return Err(violation(format!(
                                "child {} of a regular node at shift {} holds {} of {} elements",
                                i, shift, sub, full
                            )));
                        }
                        total += sub;
                    }
                    Ok(total)
                }
            }
        }
    }
}
