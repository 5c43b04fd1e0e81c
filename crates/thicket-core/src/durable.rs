//! Durable indexed list: an AVL order-statistics tree
//!
//! Items are kept in sequence order and addressed by rank. Every slot keeps
//! its subtree count and a parent link, so the rank of an item can be read
//! back from its [`Handle`] in O(log n) after any number of inserts and
//! removes elsewhere in the list. All slots live in one `Vec` arena; links
//! are indices with [`NIL`] as the sentinel.
//!
//! Operations:
//! - `insert(rank, item)`: O(log n)
//! - `remove(rank)`: O(log n), never moves other items between slots
//! - `get(rank)` / `rank(handle)`: O(log n)

const NIL: usize = usize::MAX;

/// Stable reference to an item, valid until that item is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

#[derive(Debug, Clone)]
struct Slot<T> {
    item: Option<T>,
    left: usize,
    right: usize,
    parent: usize,
    height: u32,
    count: usize,
}

impl<T> Slot<T> {
    fn new(item: T) -> Self {
        Slot {
            item: Some(item),
            left: NIL,
            right: NIL,
            parent: NIL,
            height: 1,
            count: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DurableList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    root: usize,
}

impl<T: Copy> DurableList<T> {
    pub fn new() -> Self {
        DurableList {
            slots: Vec::new(),
            free: Vec::new(),
            root: NIL,
        }
    }

    pub fn len(&self) -> usize {
        self.count(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    /// Insert `item` so that it ends up at `rank`. Ranks past the end append.
    pub fn insert(&mut self, rank: usize, item: T) -> Handle {
        let rank = rank.min(self.len());
        let slot = self.alloc(item);
        let root = self.insert_at(self.root, rank, slot);
        self.set_root(root);
        Handle(slot)
    }

    /// Remove and return the item at `rank`.
    pub fn remove(&mut self, rank: usize) -> Option<T> {
        if rank >= self.len() {
            return None;
        }
        let (root, removed) = self.remove_at(self.root, rank);
        self.set_root(root);
        let item = self.slots[removed].item.take();
        self.release(removed);
        item
    }

    pub fn get(&self, rank: usize) -> Option<T> {
        let mut at = self.root;
        let mut rank = rank;
        while at != NIL {
            let left_count = self.count(self.slots[at].left);
            if rank < left_count {
                at = self.slots[at].left;
            } else if rank == left_count {
                return self.slots[at].item;
            } else {
                rank -= left_count + 1;
                at = self.slots[at].right;
            }
        }
        None
    }

    /// Item stored behind `handle`, if it is still live.
    pub fn item(&self, handle: Handle) -> Option<T> {
        self.slots.get(handle.0).and_then(|slot| slot.item)
    }

    /// Current rank of the item behind `handle`.
    pub fn rank(&self, handle: Handle) -> usize {
        let mut at = handle.0;
        let mut rank = self.count(self.slots[at].left);
        while self.slots[at].parent != NIL {
            let parent = self.slots[at].parent;
            if self.slots[parent].right == at {
                rank += self.count(self.slots[parent].left) + 1;
            }
            at = parent;
        }
        rank
    }

    /// In-order iteration over all items.
    pub fn iter(&self) -> Iter<'_, T> {
        let mut iter = Iter {
            list: self,
            stack: Vec::new(),
        };
        iter.push_left(self.root);
        iter
    }

    /// Height of the balanced tree, for diagnostics.
    pub fn depth(&self) -> u32 {
        self.height(self.root)
    }

    fn count(&self, at: usize) -> usize {
        if at == NIL { 0 } else { self.slots[at].count }
    }

    fn height(&self, at: usize) -> u32 {
        if at == NIL { 0 } else { self.slots[at].height }
    }

    fn alloc(&mut self, item: T) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Slot::new(item);
                slot
            }
            None => {
                self.slots.push(Slot::new(item));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, slot: usize) {
        let entry = &mut self.slots[slot];
        entry.left = NIL;
        entry.right = NIL;
        entry.parent = NIL;
        entry.height = 0;
        entry.count = 0;
        self.free.push(slot);
    }

    fn set_root(&mut self, root: usize) {
        self.root = root;
        if root != NIL {
            self.slots[root].parent = NIL;
        }
    }

    fn attach_left(&mut self, parent: usize, child: usize) {
        self.slots[parent].left = child;
        if child != NIL {
            self.slots[child].parent = parent;
        }
    }

    fn attach_right(&mut self, parent: usize, child: usize) {
        self.slots[parent].right = child;
        if child != NIL {
            self.slots[child].parent = parent;
        }
    }

    fn update(&mut self, at: usize) {
        let (left, right) = (self.slots[at].left, self.slots[at].right);
        let height = 1 + self.height(left).max(self.height(right));
        let count = 1 + self.count(left) + self.count(right);
        let slot = &mut self.slots[at];
        slot.height = height;
        slot.count = count;
    }

    fn balance(&self, at: usize) -> i64 {
        self.height(self.slots[at].left) as i64 - self.height(self.slots[at].right) as i64
    }

    // The returned subtree root gets its parent link from the caller.
    fn rotate_right(&mut self, at: usize) -> usize {
        let pivot = self.slots[at].left;
        let inner = self.slots[pivot].right;
        self.attach_left(at, inner);
        self.attach_right(pivot, at);
        self.update(at);
        self.update(pivot);
        pivot
    }

    fn rotate_left(&mut self, at: usize) -> usize {
        let pivot = self.slots[at].right;
        let inner = self.slots[pivot].left;
        self.attach_right(at, inner);
        self.attach_left(pivot, at);
        self.update(at);
        self.update(pivot);
        pivot
    }

    fn rebalance(&mut self, at: usize) -> usize {
        self.update(at);
        let balance = self.balance(at);
        if balance > 1 {
            let left = self.slots[at].left;
            if self.balance(left) < 0 {
                let rotated = self.rotate_left(left);
                self.attach_left(at, rotated);
            }
            return self.rotate_right(at);
        }
        if balance < -1 {
            let right = self.slots[at].right;
            if self.balance(right) > 0 {
                let rotated = self.rotate_right(right);
                self.attach_right(at, rotated);
            }
            return self.rotate_left(at);
        }
        at
    }

    fn insert_at(&mut self, at: usize, rank: usize, slot: usize) -> usize {
        if at == NIL {
            return slot;
        }
        let left = self.slots[at].left;
        let left_count = self.count(left);
        if rank <= left_count {
            let child = self.insert_at(left, rank, slot);
            self.attach_left(at, child);
        } else {
            let right = self.slots[at].right;
            let child = self.insert_at(right, rank - left_count - 1, slot);
            self.attach_right(at, child);
        }
        self.rebalance(at)
    }

    /// Returns (new subtree root, unlinked slot).
    fn remove_at(&mut self, at: usize, rank: usize) -> (usize, usize) {
        let (left, right) = (self.slots[at].left, self.slots[at].right);
        let left_count = self.count(left);
        if rank < left_count {
            let (child, removed) = self.remove_at(left, rank);
            self.attach_left(at, child);
            return (self.rebalance(at), removed);
        }
        if rank > left_count {
            let (child, removed) = self.remove_at(right, rank - left_count - 1);
            self.attach_right(at, child);
            return (self.rebalance(at), removed);
        }
        if left == NIL {
            return (right, at);
        }
        if right == NIL {
            return (left, at);
        }
        // Splice the in-order successor into this position instead of moving
        // items, so handles of other items stay valid.
        let (rest, successor) = self.detach_min(right);
        self.attach_left(successor, left);
        self.attach_right(successor, rest);
        (self.rebalance(successor), at)
    }

    fn detach_min(&mut self, at: usize) -> (usize, usize) {
        let left = self.slots[at].left;
        if left == NIL {
            return (self.slots[at].right, at);
        }
        let (child, min) = self.detach_min(left);
        self.attach_left(at, child);
        (self.rebalance(at), min)
    }
}

impl<T: Copy> Default for DurableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-order iterator over a [`DurableList`].
pub struct Iter<'a, T> {
    list: &'a DurableList<T>,
    stack: Vec<usize>,
}

impl<T> Iter<'_, T> {
    fn push_left(&mut self, mut at: usize) {
        while at != NIL {
            self.stack.push(at);
            at = self.list.slots[at].left;
        }
    }
}

impl<T: Copy> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let at = self.stack.pop()?;
        self.push_left(self.list.slots[at].right);
        self.list.slots[at].item
    }
}
