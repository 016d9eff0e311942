//! Concatenation of two trees.
//!
//! The merge walks both right and left spines down to a common level and
//! rebalances three nodes at a time (left, centre, right) on the way back
//! up. Rebalancing computes a plan: the child counts the merged node should
//! end up with, squeezed until the node count is within `EXTRAS` of optimal
//! while no surviving child is forced below `BRANCHING - INVARIANT`
//! grandchildren. Children the plan leaves untouched are shared with the
//! inputs; the rest are rebuilt by a cursor copying grandchildren across.

use std::sync::Arc;

use crate::config::{BITS, BRANCHING, EXTRAS, INVARIANT};

use super::node::{subtree_size, Internal, Leaf, Link, Node, SizeTable, PERSISTENT};
use super::Vector;

impl<T: Clone> Vector<T> {
    /// Returns the ordered concatenation of `self` and `other`. Both inputs
    /// are unchanged; unmoved subtrees are shared with the result.
    pub fn concat(&self, other: &Vector<T>) -> Vector<T> {
        if self.len == 0 {
            return other.clone();
        }
        if other.len == 0 {
            return self.clone();
        }

        #[cfg(feature = "tail")]
        {
            if other.root.is_none() {
                // The right side lives entirely in its tail, so no tree
                // merge is needed.
                let left_tail = &self.tail.elems;
                let right_tail = &other.tail.elems;
                if left_tail.len() == BRANCHING {
                    let mut new = self.clone();
                    new.len += other.len;
                    new.tail = other.tail.clone();
                    new.push_down_tail(Arc::new(Node::Leaf((*self.tail).clone())));
                    return new;
                }
                if left_tail.len() + right_tail.len() <= BRANCHING {
                    let mut tail = (*self.tail).clone();
                    for value in right_tail {
                        tail.elems.push(value.clone());
                    }
                    let mut new = self.clone();
                    new.len += other.len;
                    new.tail = Arc::new(tail);
                    return new;
                }
                // The combined tails overflow a leaf: fill one completely,
                // push it down, and keep the remainder as the tail.
                let cut = BRANCHING - left_tail.len();
                let mut full = (*self.tail).clone();
                for value in &right_tail[..cut] {
                    full.elems.push(value.clone());
                }
                let mut tail = Leaf::empty(PERSISTENT);
                for value in &right_tail[cut..] {
                    tail.elems.push(value.clone());
                }
                let mut new = self.clone();
                new.len += other.len;
                new.tail = Arc::new(tail);
                new.push_down_tail(Arc::new(Node::Leaf(full)));
                return new;
            }
        }

        // Fold our tail into the tree so the merge only deals with trees;
        // the result inherits the right side's tail as-is.
        #[cfg(feature = "tail")]
        let left = {
            let mut left = self.clone();
            left.push_down_tail(Arc::new(Node::Leaf((*self.tail).clone())));
            left
        };
        #[cfg(not(feature = "tail"))]
        let left = self.clone();

        let left_root = match &left.root {
            Some(root) => root,
            None => panic!("concat on a rootless tree"),
        };
        let right_root = match &other.root {
            Some(root) => root,
            None => panic!("concat on a rootless tree"),
        };

        let candidate = concat_sub_tree(left_root, left.shift, right_root, other.shift, true);
        let mut shift = find_shift(&candidate);
        let mut root = with_sizes(candidate, shift);
        // A merge that fits in one node comes back wrapped; unwrap any
        // single-child layers so the root invariant holds.
        loop {
            let child = match root.as_ref() {
                Node::Internal(internal) if internal.children.len() == 1 => {
                    Arc::clone(&internal.children[0])
                }
                _ => break,
            };
            root = child;
            shift -= BITS;
        }

        Vector {
            len: self.len + other.len,
            shift,
            root: Some(root),
            #[cfg(feature = "tail")]
            tail: other.tail.clone(),
        }
    }
}

/// Merges two subtrees of possibly different heights into a node one level
/// above the taller of the two (except at the top, where the result may be
/// the merged node itself).
fn concat_sub_tree<T: Clone>(
    left: &Link<T>,
    left_shift: usize,
    right: &Link<T>,
    right_shift: usize,
    is_top: bool,
) -> Link<T> {
    if left_shift > right_shift {
        let internal = left.as_internal();
        let last = internal.children.len() - 1;
        let centre = concat_sub_tree(
            &internal.children[last],
            left_shift - BITS,
            right,
            right_shift,
            false,
        );
        rebalance(Some(internal), &centre, None, left_shift, is_top)
    } else if left_shift < right_shift {
        let internal = right.as_internal();
        let centre = concat_sub_tree(
            left,
            left_shift,
            &internal.children[0],
            right_shift - BITS,
            false,
        );
        rebalance(None, &centre, Some(internal), right_shift, is_top)
    } else if left_shift == 0 {
        let left_leaf = left.as_leaf();
        let right_leaf = right.as_leaf();
        if is_top && left_leaf.elems.len() + right_leaf.elems.len() <= BRANCHING {
            let mut merged = Leaf::empty(PERSISTENT);
            for value in &left_leaf.elems {
                merged.elems.push(value.clone());
            }
            for value in &right_leaf.elems {
                merged.elems.push(value.clone());
            }
            above1(Arc::new(Node::Leaf(merged)))
        } else {
            above2(Arc::clone(left), Arc::clone(right))
        }
    } else {
        let left_internal = left.as_internal();
        let right_internal = right.as_internal();
        let last = left_internal.children.len() - 1;
        let centre = concat_sub_tree(
            &left_internal.children[last],
            left_shift - BITS,
            &right_internal.children[0],
            right_shift - BITS,
            false,
        );
        rebalance(
            Some(left_internal),
            &centre,
            Some(right_internal),
            left_shift,
            is_top,
        )
    }
}

/// Merges the children of up to three nodes at height `shift` into one
/// sequence, leaving out the boundary children the recursion has already
/// merged into `centre`, and rebuilds it according to the plan.
fn rebalance<T: Clone>(
    left: Option<&Internal<T>>,
    centre: &Link<T>,
    right: Option<&Internal<T>>,
    shift: usize,
    is_top: bool,
) -> Link<T> {
    let centre_internal = centre.as_internal();

    let mut all: Vec<Link<T>> = Vec::new();
    if let Some(left) = left {
        let last = left.children.len() - 1;
        all.extend(left.children[..last].iter().cloned());
    }
    all.extend(centre_internal.children.iter().cloned());
    if let Some(right) = right {
        all.extend(right.children[1..].iter().cloned());
    }

    let plan = rebalance_plan(&all);
    let new_all = copy_across(&all, &plan, shift);

    if new_all.len() <= BRANCHING {
        let mut node = Internal::empty(PERSISTENT);
        node.children.extend(new_all);
        let link = Arc::new(Node::Internal(node));
        if is_top {
            link
        } else {
            above1(with_sizes(link, shift))
        }
    } else {
        let mut left_node = Internal::empty(PERSISTENT);
        let mut right_node = Internal::empty(PERSISTENT);
        for (i, child) in new_all.into_iter().enumerate() {
            if i < BRANCHING {
                left_node.children.push(child);
            } else {
                right_node.children.push(child);
            }
        }
        above2(
            with_sizes(Arc::new(Node::Internal(left_node)), shift),
            with_sizes(Arc::new(Node::Internal(right_node)), shift),
        )
    }
}

/// Computes the child counts the merged node should end up with: starts
/// from the current counts and, while more than `optimal + EXTRAS` slots
/// survive, empties the first slot holding `BRANCHING - INVARIANT` children
/// or fewer into its right neighbours.
fn rebalance_plan<T>(all: &[Link<T>]) -> Vec<usize> {
    let mut sizes: Vec<usize> = all.iter().map(|child| child.len()).collect();
    let total: usize = sizes.iter().sum();
    let optimal = total / BRANCHING + 1;
    let min_width = BRANCHING - INVARIANT;

    let mut len = sizes.len();
    while len > optimal + EXTRAS {
        let mut i = 0;
        while sizes[i] > min_width {
            i += 1;
        }
        // Pour the short slot into the following ones, topping each up to a
        // full node.
        let mut spill = sizes[i];
        loop {
            let next = sizes[i + 1];
            let merged = (spill + next).min(BRANCHING);
            sizes[i] = merged;
            spill = spill + next - merged;
            i += 1;
            if spill == 0 {
                break;
            }
        }
        // Close the gap left by the emptied slot.
        while i < len - 1 {
            sizes[i] = sizes[i + 1];
            i += 1;
        }
        len -= 1;
    }
    sizes.truncate(len);
    sizes
}

/// Materializes the plan: slots whose size already matches a source child
/// reuse it by pointer; the rest are rebuilt by copying grandchildren (or
/// elements, one level up from the leaves) from consecutive sources.
fn copy_across<T: Clone>(all: &[Link<T>], plan: &[usize], shift: usize) -> Vec<Link<T>> {
    let mut new_all: Vec<Link<T>> = Vec::with_capacity(plan.len());
    let mut idx = 0;
    let mut offset = 0;

    if shift == BITS {
        for &new_size in plan {
            if offset == 0 && new_size == all[idx].len() {
                new_all.push(Arc::clone(&all[idx]));
                idx += 1;
                continue;
            }
            let mut merged = Leaf::empty(PERSISTENT);
            while merged.elems.len() < new_size && idx < all.len() {
                let leaf = all[idx].as_leaf();
                let available = leaf.elems.len() - offset;
                let wanted = new_size - merged.elems.len();
                if wanted >= available {
                    for value in &leaf.elems[offset..] {
                        merged.elems.push(value.clone());
                    }
                    idx += 1;
                    offset = 0;
                } else {
                    for value in &leaf.elems[offset..offset + wanted] {
                        merged.elems.push(value.clone());
                    }
                    offset += wanted;
                }
            }
            new_all.push(Arc::new(Node::Leaf(merged)));
        }
    } else {
        for &new_size in plan {
            if offset == 0 && new_size == all[idx].len() {
                new_all.push(Arc::clone(&all[idx]));
                idx += 1;
                continue;
            }
            let mut merged: Internal<T> = Internal::empty(PERSISTENT);
            while merged.children.len() < new_size && idx < all.len() {
                let node = all[idx].as_internal();
                let available = node.children.len() - offset;
                let wanted = new_size - merged.children.len();
                if wanted > available {
                    merged
                        .children
                        .extend(node.children[offset..].iter().cloned());
                    idx += 1;
                    offset = 0;
                } else {
                    merged
                        .children
                        .extend(node.children[offset..offset + wanted].iter().cloned());
                    offset += wanted;
                }
            }
            let fresh = Arc::new(Node::Internal(merged));
            new_all.push(with_sizes(fresh, shift - BITS));
        }
    }
    new_all
}

fn above1<T>(child: Link<T>) -> Link<T> {
    let mut above = Internal::empty(PERSISTENT);
    above.children.push(child);
    Arc::new(Node::Internal(above))
}

fn above2<T>(left: Link<T>, right: Link<T>) -> Link<T> {
    let mut above = Internal::empty(PERSISTENT);
    above.children.push(left);
    above.children.push(right);
    Arc::new(Node::Internal(above))
}

/// Height of the subtree, in shift units.
pub(crate) fn find_shift<T>(node: &Link<T>) -> usize {
    match node.as_ref() {
        Node::Leaf(_) => 0,
        Node::Internal(internal) => BITS + find_shift(&internal.children[0]),
    }
}

/// Attaches a freshly computed size table to an internal node at height
/// `shift`, making it relaxed. Leaves pass through unchanged.
pub(crate) fn with_sizes<T: Clone>(link: Link<T>, shift: usize) -> Link<T> {
    let node = match Arc::try_unwrap(link) {
        Ok(node) => node,
        Err(shared) => (*shared).clone(),
    };
    match node {
        Node::Leaf(_) => Arc::new(node),
        Node::Internal(mut internal) => {
            let mut sizes = SizeTable::new();
            let mut sum = 0;
            for child in &internal.children {
                sum += subtree_size(child, shift - BITS);
                sizes.push(sum);
            }
            internal.sizes = Some(Box::new(sizes));
            Arc::new(Node::Internal(internal))
        }
    }
}
