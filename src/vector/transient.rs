//! Transient (mutable-batch) editing.
//!
//! A [`TransientVector`] is a snapshot of a vector tied to a fresh token.
//! Nodes created on its behalf are tagged with the token and may be edited
//! in place; any other node is cloned and re-tagged the first time an
//! operation descends into it, after which it too is owned. Freezing
//! revokes the token, so the nodes become unreachable for in-place edits
//! and the result is an ordinary persistent vector. Tokens are never
//! reused, which is what makes the stale tags on frozen nodes inert.
//!
//! A transient belongs to the thread that created it; touching it from
//! anywhere else (or after freezing) fails with
//! [`Error::MisusedTransient`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::thread::ThreadId;

use crate::config::{BITS, BRANCHING, MASK};
use crate::error::Error;

use super::node::{spine, subtree_size, Internal, Leaf, Link, Node, SizeTable};
use super::{trie_get, Vector};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn fresh_token() -> u64 {
    NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
}

/// A mutable handle on a vector, for building or editing in bulk before
/// freezing back into a persistent [`Vector`].
pub struct TransientVector<T> {
    len: usize,
    shift: usize,
    root: Option<Link<T>>,
    tail: Arc<Leaf<T>>,
    /// Revoked (set to `None`) by `freeze`.
    token: Option<u64>,
    owner: ThreadId,
}

impl<T: Clone> Vector<T> {
    /// Opens a transient session on this vector. The vector itself is
    /// unaffected; the transient starts out sharing its tree.
    pub fn to_transient(&self) -> TransientVector<T> {
        let token = fresh_token();
        let mut tail = (*self.tail).clone();
        tail.edit = token;
        TransientVector {
            len: self.len,
            shift: self.shift,
            root: self.root.clone(),
            tail: Arc::new(tail),
            token: Some(token),
            owner: thread::current().id(),
        }
    }
}

impl<T: Clone> TransientVector<T> {
    fn guard(&self) -> Result<u64, Error> {
        match self.token {
            Some(token) if thread::current().id() == self.owner => Ok(token),
            _ => Err(Error::MisusedTransient),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> Result<usize, Error> {
        self.guard()?;
        Ok(self.len)
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        self.guard()?;
        Ok(self.len == 0)
    }

    /// Borrows the element at `index`.
    pub fn get(&self, index: usize) -> Result<&T, Error> {
        self.guard()?;
        if index >= self.len {
            return Err(Error::OutOfRange {
                index,
                len: self.len,
            });
        }
        let tail_offset = self.len - self.tail.elems.len();
        if index >= tail_offset {
            return Ok(&self.tail.elems[index - tail_offset]);
        }
        match &self.root {
            Some(root) => Ok(trie_get(root, self.shift, index)),
            None => Err(Error::OutOfRange {
                index,
                len: self.len,
            }),
        }
    }

    /// Borrows the element at `index`; alias of [`TransientVector::get`]
    /// matching the persistent API.
    pub fn nth(&self, index: usize) -> Result<&T, Error> {
        self.get(index)
    }

    /// Borrows the last element.
    pub fn peek(&self) -> Result<&T, Error> {
        self.guard()?;
        match self.tail.elems.last() {
            Some(value) => Ok(value),
            None => Err(Error::Empty),
        }
    }

    /// Appends `value` in place.
    pub fn push(&mut self, value: T) -> Result<(), Error> {
        let token = self.guard()?;
        self.push_raw(value, token);
        Ok(())
    }

    /// Removes the last element in place.
    pub fn pop(&mut self) -> Result<(), Error> {
        let token = self.guard()?;
        if self.len == 0 {
            return Err(Error::Empty);
        }
        self.pop_raw(token);
        Ok(())
    }

    /// Replaces the element at `index` in place.
    pub fn update(&mut self, index: usize, value: T) -> Result<(), Error> {
        let token = self.guard()?;
        if index >= self.len {
            return Err(Error::OutOfRange {
                index,
                len: self.len,
            });
        }
        let tail_offset = self.len - self.tail.elems.len();
        if index >= tail_offset {
            let tail = ensure_tail_editable(&mut self.tail, token);
            tail.elems[index - tail_offset] = value;
            return Ok(());
        }
        match &mut self.root {
            Some(root) => update_node_mut(root, self.shift, index, value, token),
            None => panic!("transient tree out of sync with its length"),
        }
        Ok(())
    }

    /// Revokes the token and returns the persistent result. The transient
    /// husk stays around, but every further operation on it (including a
    /// second freeze) fails with [`Error::MisusedTransient`].
    pub fn freeze(&mut self) -> Result<Vector<T>, Error> {
        self.guard()?;
        self.token = None;
        Ok(Vector {
            len: self.len,
            shift: self.shift,
            root: self.root.clone(),
            tail: self.tail.clone(),
        })
    }

    fn push_raw(&mut self, value: T, token: u64) {
        if self.tail.elems.len() < BRANCHING {
            let tail = ensure_tail_editable(&mut self.tail, token);
            tail.elems.push(value);
            self.len += 1;
            return;
        }
        // Full tail moves into the tree; the new element starts the next
        // one. Reuse the buffer when nobody else holds it.
        let old_tail = std::mem::replace(&mut self.tail, Arc::new(Leaf::unit(value, token)));
        let full = match Arc::try_unwrap(old_tail) {
            Ok(leaf) => leaf,
            Err(shared) => (*shared).clone(),
        };
        self.len += 1;
        self.push_down_tail_mut(Arc::new(Node::Leaf(full)), token);
    }

    fn push_down_tail_mut(&mut self, leaf: Link<T>, token: u64) {
        let leaf_len = leaf.len();
        let mut root = match self.root.take() {
            None => {
                self.root = Some(leaf);
                self.shift = 0;
                return;
            }
            Some(root) => root,
        };
        if has_room(root.as_ref(), self.shift) {
            append_leaf_mut(&mut root, self.shift, leaf, leaf_len, token);
            self.root = Some(root);
            return;
        }
        let old_size = subtree_size(root.as_ref(), self.shift);
        let relaxed = old_size != BRANCHING << self.shift
            || matches!(
                root.as_ref(),
                Node::Internal(internal) if internal.is_relaxed()
            );
        let mut above = Internal::empty(token);
        above.children.push(root);
        above.children.push(spine(self.shift, leaf, token));
        if relaxed {
            let mut sizes = SizeTable::new();
            sizes.push(old_size);
            sizes.push(old_size + leaf_len);
            above.sizes = Some(Box::new(sizes));
        }
        self.shift += BITS;
        self.root = Some(Arc::new(Node::Internal(above)));
    }

    fn pop_raw(&mut self, token: u64) {
        if self.len == 1 {
            self.len = 0;
            self.root = None;
            self.shift = 0;
            let tail = ensure_tail_editable(&mut self.tail, token);
            tail.elems.clear();
            return;
        }
        self.len -= 1;
        if self.tail.elems.len() > 1 {
            let tail = ensure_tail_editable(&mut self.tail, token);
            tail.elems.pop();
            return;
        }
        // The lone tail element went away; promote the tree's rightmost
        // leaf in place.
        let mut root = match self.root.take() {
            Some(root) => root,
            None => panic!("transient tree out of sync with its length"),
        };
        let (mut leaf, emptied) = take_rightmost_leaf_mut(&mut root, self.shift, token);
        leaf.edit = token;
        self.tail = Arc::new(leaf);
        if emptied {
            self.root = None;
            self.shift = 0;
            return;
        }
        loop {
            let child = match root.as_ref() {
                Node::Internal(internal) if internal.children.len() == 1 => {
                    Arc::clone(&internal.children[0])
                }
                _ => break,
            };
            root = child;
            self.shift -= BITS;
        }
        self.root = Some(root);
    }
}

/// Clone-and-tag a node unless this transient already owns it, then hand
/// out the mutable reference.
fn ensure_editable<T: Clone>(link: &mut Link<T>, token: u64) -> &mut Node<T> {
    if link.edit() != token {
        let mut copy = (**link).clone();
        copy.set_edit(token);
        *link = Arc::new(copy);
    }
    Arc::make_mut(link)
}

fn ensure_tail_editable<T: Clone>(tail: &mut Arc<Leaf<T>>, token: u64) -> &mut Leaf<T> {
    if tail.edit != token {
        let mut copy = (**tail).clone();
        copy.edit = token;
        *tail = Arc::new(copy);
    }
    Arc::make_mut(tail)
}

/// Whether the rightmost spine can absorb one more leaf without growing
/// the tree.
fn has_room<T>(node: &Node<T>, shift: usize) -> bool {
    match node {
        Node::Leaf(_) => false,
        Node::Internal(internal) => {
            internal.children.len() < BRANCHING
                || (shift > BITS
                    && has_room(
                        internal.children[internal.children.len() - 1].as_ref(),
                        shift - BITS,
                    ))
        }
    }
}

/// In-place analogue of the persistent append path: descends as deep as
/// room exists, tagging the spine, and attaches the leaf there. The caller
/// has checked `has_room`.
fn append_leaf_mut<T: Clone>(
    link: &mut Link<T>,
    shift: usize,
    leaf: Link<T>,
    leaf_len: usize,
    token: u64,
) {
    let node = ensure_editable(link, token);
    let internal = match node {
        Node::Internal(internal) => internal,
        Node::Leaf(_) => panic!("append into a leaf"),
    };
    let last = internal.children.len() - 1;
    if shift > BITS && has_room(internal.children[last].as_ref(), shift - BITS) {
        if let Some(sizes) = internal.sizes.as_deref_mut() {
            sizes[last] += leaf_len;
        }
        append_leaf_mut(&mut internal.children[last], shift - BITS, leaf, leaf_len, token);
    } else {
        if let Some(sizes) = internal.sizes.as_deref_mut() {
            let prev = sizes[last];
            sizes.push(prev + leaf_len);
        }
        internal.children.push(spine(shift - BITS, leaf, token));
    }
}

fn update_node_mut<T: Clone>(
    link: &mut Link<T>,
    shift: usize,
    mut index: usize,
    value: T,
    token: u64,
) {
    let node = ensure_editable(link, token);
    match node {
        Node::Leaf(leaf) => leaf.elems[index & MASK] = value,
        Node::Internal(internal) => {
            let slot = internal.position(&mut index, shift);
            update_node_mut(&mut internal.children[slot], shift - BITS, index, value, token);
        }
    }
}

/// Removes the rightmost leaf in place, tagging the path. Returns the leaf
/// and whether the subtree under `link` became empty.
fn take_rightmost_leaf_mut<T: Clone>(
    link: &mut Link<T>,
    shift: usize,
    token: u64,
) -> (Leaf<T>, bool) {
    if shift == 0 {
        let taken = std::mem::replace(link, Arc::new(Node::Leaf(Leaf::empty(token))));
        let leaf = match Arc::try_unwrap(taken) {
            Ok(Node::Leaf(leaf)) => leaf,
            Ok(Node::Internal(_)) => panic!("internal node at leaf level"),
            Err(shared) => match shared.as_ref() {
                Node::Leaf(leaf) => leaf.clone(),
                Node::Internal(_) => panic!("internal node at leaf level"),
            },
        };
        return (leaf, true);
    }
    let node = ensure_editable(link, token);
    let internal = match node {
        Node::Internal(internal) => internal,
        Node::Leaf(_) => panic!("leaf above ground level"),
    };
    let last = internal.children.len() - 1;
    let (leaf, child_emptied) = take_rightmost_leaf_mut(&mut internal.children[last], shift - BITS, token);
    if child_emptied {
        internal.children.truncate(last);
        if let Some(sizes) = internal.sizes.as_deref_mut() {
            sizes.truncate(last);
        }
        let emptied = internal.children.is_empty();
        (leaf, emptied)
    } else {
        if let Some(sizes) = internal.sizes.as_deref_mut() {
            sizes[last] -= leaf.elems.len();
        }
        (leaf, false)
    }
}

impl<T: Clone> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut transient = Vector::new().to_transient();
        let token = match transient.token {
            Some(token) => token,
            None => panic!("fresh transient carries no token"),
        };
        for value in iter {
            transient.push_raw(value, token);
        }
        let TransientVector {
            len,
            shift,
            root,
            tail,
            ..
        } = transient;
        Vector {
            len,
            shift,
            root,
            tail,
        }
    }
}

impl<T: Clone> Extend<T> for Vector<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let mut transient = self.to_transient();
        let token = match transient.token {
            Some(token) => token,
            None => panic!("fresh transient carries no token"),
        };
        for value in iter {
            transient.push_raw(value, token);
        }
        let TransientVector {
            len,
            shift,
            root,
            tail,
            ..
        } = transient;
        *self = Vector {
            len,
            shift,
            root,
            tail,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_roundtrip_preserves_elements() {
        let source: Vector<u32> = (0..1000u32).collect();
        let mut transient = source.to_transient();
        let frozen = transient.freeze().unwrap();
        assert_eq!(frozen, source);
    }

    #[test]
    fn transient_push_does_not_leak_into_source() {
        let source: Vector<u32> = (0..100u32).collect();
        let mut transient = source.to_transient();
        for i in 100..300u32 {
            transient.push(i).unwrap();
        }
        let frozen = transient.freeze().unwrap();
        assert_eq!(source.len(), 100);
        for i in 0..100usize {
            assert_eq!(source.get(i), Some(&(i as u32)));
        }
        assert_eq!(frozen.len(), 300);
        for i in 0..300usize {
            assert_eq!(frozen.get(i), Some(&(i as u32)));
        }
        assert!(source.validate().is_ok());
        assert!(frozen.validate().is_ok());
    }

    #[test]
    fn frozen_transient_rejects_everything() {
        let mut transient = Vector::<u32>::new().to_transient();
        transient.push(1).unwrap();
        let _ = transient.freeze().unwrap();
        assert_eq!(transient.push(2), Err(Error::MisusedTransient));
        assert_eq!(transient.pop(), Err(Error::MisusedTransient));
        assert_eq!(transient.update(0, 9), Err(Error::MisusedTransient));
        assert_eq!(transient.get(0), Err(Error::MisusedTransient));
        assert_eq!(transient.peek(), Err(Error::MisusedTransient));
        assert_eq!(transient.len(), Err(Error::MisusedTransient));
        assert_eq!(transient.freeze().unwrap_err(), Error::MisusedTransient);
    }

    #[test]
    fn foreign_thread_is_rejected() {
        let mut transient = Vector::<u32>::new().to_transient();
        transient.push(1).unwrap();
        let handle = std::thread::spawn(move || {
            let err = transient.push(2).unwrap_err();
            assert_eq!(err, Error::MisusedTransient);
        });
        handle.join().unwrap();
    }

    #[test]
    fn collect_uses_one_session() {
        let v: Vector<usize> = (0..100_000).collect();
        assert_eq!(v.len(), 100_000);
        for i in (0..100_000).step_by(997) {
            assert_eq!(v.get(i), Some(&i));
        }
        assert!(v.validate().is_ok());
    }
}
