//! The heap arena backing strings, arrays, and objects.
//!
//! Heap values are stored in `Option` slots indexed by [`HeapId`]; freed
//! slots go on a free list and are reused. Each allocation bumps a pressure
//! counter owned by the heap; crossing the threshold raises the
//! collection-due flag, which the evaluator drains at its single safepoint
//! (immediately after a completed assignment). The mark bits live here; the
//! mark/sweep traversal itself is in [`crate::gc`] since it also walks the
//! environment arena.

use crate::environment::EnvId;
use crate::value::Value;

/// Unique identifier for values stored inside the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub(crate) struct HeapId(u32);

impl HeapId {
    fn new(index: usize) -> Self {
        Self(index.try_into().expect("HeapId overflow"))
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A heap array: elements plus the growth margin the allocator reserved.
///
/// Length is `elements.len()`; capacity is managed through the backing `Vec`
/// (array literals reserve `2n + 1` up front, `push` grows then copies).
#[derive(Debug, Default)]
pub(crate) struct JsArray {
    pub elements: Vec<Value>,
}

impl JsArray {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
        }
    }
}

/// A heap object: ordered own fields, an optional prototype link, and the
/// environment captured when the object literal was evaluated (used as the
/// closure chain for method calls).
#[derive(Debug, Default)]
pub(crate) struct JsObject {
    pub fields: Vec<(String, Value)>,
    pub prototype: Option<HeapId>,
    pub captured_env: Option<EnvId>,
}

impl JsObject {
    /// Index of an own field, ignoring the prototype chain.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| field == name)
    }
}

/// Every runtime value that must live in the arena.
#[derive(Debug)]
pub(crate) enum HeapData {
    Str(String),
    Array(JsArray),
    Object(JsObject),
}

/// A single arena entry: payload plus the collector's mark bit.
#[derive(Debug)]
struct HeapEntry {
    marked: bool,
    data: HeapData,
}

/// Collection trigger: one collection per this many allocations.
const GC_PRESSURE_THRESHOLD: usize = 1024;

/// Arena allocator with mark-sweep bookkeeping.
#[derive(Debug)]
pub(crate) struct Heap {
    slots: Vec<Option<HeapEntry>>,
    free: Vec<HeapId>,
    /// Allocations since the last sweep; drives the collection-due flag.
    allocated_since_gc: usize,
    gc_threshold: usize,
    gc_due: bool,
}

impl Default for Heap {
    fn default() -> Self {
        Self::with_threshold(GC_PRESSURE_THRESHOLD)
    }
}

impl Heap {
    /// Creates a heap that requests collection every `threshold` allocations.
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            allocated_since_gc: 0,
            gc_threshold: threshold.max(1),
            gc_due: false,
        }
    }

    /// Allocates a new heap value, returning the fresh identifier.
    ///
    /// Never collects; it only raises the collection-due flag for the next
    /// safepoint.
    pub fn allocate(&mut self, data: HeapData) -> HeapId {
        self.allocated_since_gc += 1;
        if self.allocated_since_gc >= self.gc_threshold {
            self.gc_due = true;
        }
        let entry = HeapEntry { marked: false, data };
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(entry);
            id
        } else {
            let id = HeapId::new(self.slots.len());
            self.slots.push(Some(entry));
            id
        }
    }

    /// True once allocation pressure has crossed the threshold; cleared by
    /// [`Heap::sweep`].
    pub fn gc_due(&self) -> bool {
        self.gc_due
    }

    /// # Panics
    /// Panics if the id is invalid or the value has been collected.
    #[must_use]
    pub fn get(&self, id: HeapId) -> &HeapData {
        &self
            .slots
            .get(id.index())
            .expect("Heap::get: slot missing")
            .as_ref()
            .expect("Heap::get: value already freed")
            .data
    }

    /// # Panics
    /// Panics if the id is invalid or the value has been collected.
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self
            .slots
            .get_mut(id.index())
            .expect("Heap::get_mut: slot missing")
            .as_mut()
            .expect("Heap::get_mut: value already freed")
            .data
    }

    /// Marks the entry, returning true if it was not marked before (the
    /// caller then traverses its children).
    pub fn mark(&mut self, id: HeapId) -> bool {
        let entry = self
            .slots
            .get_mut(id.index())
            .expect("Heap::mark: slot missing")
            .as_mut()
            .expect("Heap::mark: value already freed");
        let newly = !entry.marked;
        entry.marked = true;
        newly
    }

    /// Frees every unmarked entry, clears surviving marks, and resets the
    /// allocation-pressure counter.
    pub fn sweep(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            match slot {
                Some(entry) if entry.marked => entry.marked = false,
                Some(_) => {
                    *slot = None;
                    self.free.push(HeapId::new(index));
                }
                None => {}
            }
        }
        self.allocated_since_gc = 0;
        self.gc_due = false;
    }

    /// Number of live entries; used by tests to observe collection.
    #[cfg(test)]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
