//! Slicing: dropping a suffix (`slice_right`), a prefix (`slice_left`), or
//! both.
//!
//! Each direction recurses along the path of the cut point. Children wholly
//! inside the kept range are shared by pointer, the child containing the
//! cut is sliced recursively, and the rest are dropped. Nodes rebuilt on
//! the prefix side always gain a size table, since their children stop
//! being radix-aligned; suffix slices of regular nodes stay regular.

use std::sync::Arc;

use crate::config::BITS;
#[cfg(feature = "tail")]
use crate::config::BRANCHING;

use super::node::{subtree_size, Internal, Leaf, Link, Node, SizeTable, PERSISTENT};
use super::Vector;

impl<T: Clone> Vector<T> {
    /// Returns the elements `[from, to)` as a vector, sharing structure
    /// with `self` where possible. Bounds are clamped to the vector: a
    /// `to` past the end reads as `len`, and an empty or inverted range
    /// yields the empty vector.
    pub fn slice(&self, from: usize, to: usize) -> Self {
        self.slice_right(to).slice_left(from)
    }

    #[cfg(feature = "tail")]
    fn slice_right(&self, to: usize) -> Self {
        if to == 0 {
            return Vector::new();
        }
        if to >= self.len {
            return self.clone();
        }
        let tail_offset = self.tail_offset();
        if to > tail_offset {
            // The cut lands inside the tail; the tree is untouched.
            let mut tail = Leaf::empty(PERSISTENT);
            for value in &self.tail.elems[..to - tail_offset] {
                tail.elems.push(value.clone());
            }
            return Vector {
                len: to,
                shift: self.shift,
                root: self.root.clone(),
                tail: Arc::new(tail),
            };
        }
        let root = match &self.root {
            Some(root) => root,
            None => panic!("slice into a rootless tree"),
        };
        let (root, shift) = slice_right_rec(root, to - 1, self.shift, false);
        let mut new = Vector {
            len: to,
            shift,
            root: Some(root),
            tail: Arc::new(Leaf::empty(PERSISTENT)),
        };
        // The sliced tree still holds its rightmost leaf; pull it out as
        // the tail.
        new.promote_rightmost_leaf();
        new
    }

    #[cfg(not(feature = "tail"))]
    fn slice_right(&self, to: usize) -> Self {
        if to == 0 {
            return Vector::new();
        }
        if to >= self.len {
            return self.clone();
        }
        let root = match &self.root {
            Some(root) => root,
            None => panic!("slice into a rootless tree"),
        };
        let (root, shift) = slice_right_rec(root, to - 1, self.shift, false);
        Vector {
            len: to,
            shift,
            root: Some(root),
        }
    }

    #[cfg(feature = "tail")]
    fn slice_left(&self, from: usize) -> Self {
        if from >= self.len {
            return Vector::new();
        }
        if from == 0 {
            return self.clone();
        }
        let remaining = self.len - from;
        let tail_len = self.tail.elems.len();
        if remaining <= tail_len {
            // Everything that survives already lives in the tail.
            let mut tail = Leaf::empty(PERSISTENT);
            for value in &self.tail.elems[tail_len - remaining..] {
                tail.elems.push(value.clone());
            }
            return Vector {
                len: remaining,
                shift: 0,
                root: None,
                tail: Arc::new(tail),
            };
        }
        let root = match &self.root {
            Some(root) => root,
            None => panic!("slice into a rootless tree"),
        };
        let (root, shift) = slice_left_rec(root, from, self.shift, false);
        let mut new = Vector {
            len: remaining,
            shift,
            root: Some(root),
            tail: self.tail.clone(),
        };
        new.restore_tail_invariant();
        new
    }

    #[cfg(not(feature = "tail"))]
    fn slice_left(&self, from: usize) -> Self {
        if from >= self.len {
            return Vector::new();
        }
        if from == 0 {
            return self.clone();
        }
        let remaining = self.len - from;
        let root = match &self.root {
            Some(root) => root,
            None => panic!("slice into a rootless tree"),
        };
        let (root, shift) = slice_left_rec(root, from, self.shift, false);
        Vector {
            len: remaining,
            shift,
            root: Some(root),
        }
    }

    /// After a left slice the root may have collapsed into a lone,
    /// possibly short leaf. Either fold it into the tail outright or top
    /// it up to a full leaf from the tail's front, so pushes can keep
    /// treating the tree as radix-shaped.
    #[cfg(feature = "tail")]
    fn restore_tail_invariant(&mut self) {
        if self.shift != 0 {
            return;
        }
        let leaf = match &self.root {
            Some(root) => match root.as_ref() {
                Node::Leaf(leaf) => leaf.clone(),
                Node::Internal(_) => return,
            },
            None => return,
        };
        if self.len <= BRANCHING {
            let mut tail = leaf;
            for value in &self.tail.elems {
                tail.elems.push(value.clone());
            }
            self.root = None;
            self.tail = Arc::new(tail);
        } else if leaf.elems.len() < BRANCHING {
            let cut = BRANCHING - leaf.elems.len();
            let mut full = leaf;
            for value in &self.tail.elems[..cut] {
                full.elems.push(value.clone());
            }
            let mut tail = Leaf::empty(PERSISTENT);
            for value in &self.tail.elems[cut..] {
                tail.elems.push(value.clone());
            }
            self.root = Some(Arc::new(Node::Leaf(full)));
            self.tail = Arc::new(tail);
        }
    }
}

/// Keeps indices `0..=right` of the subtree. Returns the node and its
/// height, which drops when leading levels become superfluous.
fn slice_right_rec<T: Clone>(
    node: &Link<T>,
    right: usize,
    shift: usize,
    has_left: bool,
) -> (Link<T>, usize) {
    match node.as_ref() {
        Node::Leaf(leaf) => {
            let mut new = Leaf::empty(PERSISTENT);
            for value in &leaf.elems[..=right] {
                new.elems.push(value.clone());
            }
            (Arc::new(Node::Leaf(new)), 0)
        }
        Node::Internal(internal) => {
            let mut subidx = right >> shift;
            match &internal.sizes {
                None => {
                    let (child, child_shift) = slice_right_rec(
                        &internal.children[subidx],
                        right - (subidx << shift),
                        shift - BITS,
                        subidx != 0 || has_left,
                    );
                    if subidx == 0 {
                        if has_left {
                            let mut parent = Internal::empty(PERSISTENT);
                            parent.children.push(child);
                            (Arc::new(Node::Internal(parent)), shift)
                        } else {
                            (child, child_shift)
                        }
                    } else {
                        let mut new = Internal::empty(PERSISTENT);
                        new.children
                            .extend(internal.children[..subidx].iter().cloned());
                        new.children.push(child);
                        (Arc::new(Node::Internal(new)), shift)
                    }
                }
                Some(sizes) => {
                    while sizes[subidx] <= right {
                        subidx += 1;
                    }
                    let localized = if subidx > 0 {
                        right - sizes[subidx - 1]
                    } else {
                        right
                    };
                    let (child, child_shift) = slice_right_rec(
                        &internal.children[subidx],
                        localized,
                        shift - BITS,
                        subidx != 0 || has_left,
                    );
                    if subidx == 0 {
                        if has_left {
                            let mut parent = Internal::empty(PERSISTENT);
                            parent.children.push(child);
                            let mut table = SizeTable::new();
                            table.push(right + 1);
                            parent.sizes = Some(Box::new(table));
                            (Arc::new(Node::Internal(parent)), shift)
                        } else {
                            (child, child_shift)
                        }
                    } else {
                        let mut new = Internal::empty(PERSISTENT);
                        new.children
                            .extend(internal.children[..subidx].iter().cloned());
                        new.children.push(child);
                        let mut table = SizeTable::new();
                        table.extend(sizes[..subidx].iter().copied());
                        table.push(right + 1);
                        new.sizes = Some(Box::new(table));
                        (Arc::new(Node::Internal(new)), shift)
                    }
                }
            }
        }
    }
}

/// Drops indices `0..from` of the subtree. Returns the node and its
/// height, which drops when leading levels become superfluous. Rebuilt
/// nodes always carry a size table.
fn slice_left_rec<T: Clone>(
    node: &Link<T>,
    from: usize,
    shift: usize,
    has_right: bool,
) -> (Link<T>, usize) {
    match node.as_ref() {
        Node::Leaf(leaf) => {
            let mut new = Leaf::empty(PERSISTENT);
            for value in &leaf.elems[from..] {
                new.elems.push(value.clone());
            }
            (Arc::new(Node::Leaf(new)), 0)
        }
        Node::Internal(internal) => {
            let mut subidx = from >> shift;
            let mut idx = from;
            match &internal.sizes {
                None => idx -= subidx << shift,
                Some(sizes) => {
                    while sizes[subidx] <= idx {
                        subidx += 1;
                    }
                    if subidx > 0 {
                        idx -= sizes[subidx - 1];
                    }
                }
            }
            let last_slot = internal.children.len() - 1;
            let (child, child_shift) = slice_left_rec(
                &internal.children[subidx],
                idx,
                shift - BITS,
                subidx != last_slot || has_right,
            );
            if subidx == last_slot {
                if has_right {
                    let mut parent = Internal::empty(PERSISTENT);
                    parent.children.push(child);
                    (Arc::new(Node::Internal(parent)), shift)
                } else {
                    (child, child_shift)
                }
            } else {
                let sliced_len = internal.children.len() - subidx;
                let mut new = Internal::empty(PERSISTENT);
                new.children.push(child);
                new.children
                    .extend(internal.children[subidx + 1..].iter().cloned());
                let mut table = SizeTable::new();
                match &internal.sizes {
                    None => {
                        for i in 0..sliced_len - 1 {
                            table.push(((subidx + 1 + i) << shift) - from);
                        }
                        // The last child of a regular node need not be
                        // full; measure it instead of assuming the radix
                        // shape.
                        let before_last = (internal.children.len() - 1) << shift;
                        let last_child = &internal.children[internal.children.len() - 1];
                        table.push(
                            before_last + subtree_size(last_child.as_ref(), shift - BITS) - from,
                        );
                    }
                    Some(sizes) => {
                        for i in 0..sliced_len {
                            table.push(sizes[subidx + i] - from);
                        }
                    }
                }
                new.sizes = Some(Box::new(table));
                (Arc::new(Node::Internal(new)), shift)
            }
        }
    }
}
