//! Slab-backed intrusive recency list.
//!
//! A doubly-linked list of keys (front = least recently used, back = most
//! recently used) whose nodes live in a slab with a free list. Handles are
//! slab indices, so they stay valid across unrelated insertions and removals
//! and every operation — push, splice-to-back, remove — is O(1).

/// Stable handle to a node in a [`RecencyList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeHandle(u32);

const NIL: u32 = u32::MAX;

struct Node<K> {
    key: K,
    prev: u32,
    next: u32,
}

/// Recency-ordered key list with O(1) splice via stable handles.
pub(crate) struct RecencyList<K> {
    nodes: Vec<Option<Node<K>>>,
    free: Vec<u32>,
    head: u32,
    tail: u32,
    len: usize,
}

impl<K> RecencyList<K> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node(&self, index: u32) -> &Node<K> {
        self.nodes[index as usize]
            .as_ref()
            .unwrap_or_else(|| unreachable!("vacant recency node {index}"))
    }

    fn node_mut(&mut self, index: u32) -> &mut Node<K> {
        self.nodes[index as usize]
            .as_mut()
            .unwrap_or_else(|| unreachable!("vacant recency node {index}"))
    }

    /// Appends a key at the most-recently-used end.
    pub(crate) fn push_back(&mut self, key: K) -> NodeHandle {
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index as usize] = Some(Node {
                    key,
                    prev: NIL,
                    next: NIL,
                });
                index
            }
            None => {
                let index = u32::try_from(self.nodes.len())
                    .unwrap_or_else(|_| unreachable!("recency list exceeds u32 indices"));
                self.nodes.push(Some(Node {
                    key,
                    prev: NIL,
                    next: NIL,
                }));
                index
            }
        };
        self.link_back(index);
        self.len += 1;
        NodeHandle(index)
    }

    /// Splices an existing node to the most-recently-used end.
    pub(crate) fn move_to_back(&mut self, handle: NodeHandle) {
        if self.tail == handle.0 {
            return;
        }
        self.unlink(handle.0);
        self.link_back(handle.0);
    }

    /// Removes a node, returning its key. The handle must not be reused.
    pub(crate) fn remove(&mut self, handle: NodeHandle) -> K {
        self.unlink(handle.0);
        let node = self.nodes[handle.0 as usize]
            .take()
            .unwrap_or_else(|| unreachable!("removing vacant recency node"));
        self.free.push(handle.0);
        self.len -= 1;
        node.key
    }

    /// Handle of the least-recently-used node.
    pub(crate) fn front(&self) -> Option<NodeHandle> {
        (self.head != NIL).then_some(NodeHandle(self.head))
    }

    /// Next node toward the most-recently-used end.
    pub(crate) fn next(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let next = self.node(handle.0).next;
        (next != NIL).then_some(NodeHandle(next))
    }

    /// Key stored at the given node.
    pub(crate) fn key(&self, handle: NodeHandle) -> &K {
        &self.node(handle.0).key
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    fn link_back(&mut self, index: u32) {
        let old_tail = self.tail;
        {
            let node = self.node_mut(index);
            node.prev = old_tail;
            node.next = NIL;
        }
        if old_tail != NIL {
            self.node_mut(old_tail).next = index;
        } else {
            self.head = index;
        }
        self.tail = index;
    }

    fn unlink(&mut self, index: u32) {
        let (prev, next) = {
            let node = self.node(index);
            (node.prev, node.next)
        };
        if prev != NIL {
            self.node_mut(prev).next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.node_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }
    }
}
