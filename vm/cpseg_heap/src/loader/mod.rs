//! Class-loading unit.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cpseg_ir::PoolId;

use crate::{HandleTable, LoaderConfig, ManagedHeap, MetaArena};

/// Owner of everything a loaded class's constant pools allocate.
///
/// Metadata lives in the loader's arena and dies with the loader. Heap
/// arrays are rooted through the loader's handle table so they survive
/// heap relocation independently of any local reference.
pub struct LoaderData {
    arena: MetaArena,
    handles: HandleTable,
    heap: Arc<ManagedHeap>,
    next_pool: AtomicU32,
}

impl LoaderData {
    /// Create a loader over `heap`, with the arena bounded by `config`.
    pub fn new(config: &LoaderConfig, heap: Arc<ManagedHeap>) -> Self {
        LoaderData {
            arena: MetaArena::new(config.metaspace_words),
            handles: HandleTable::new(),
            heap,
            next_pool: AtomicU32::new(0),
        }
    }

    /// Create a loader and a private heap, both bounded by `config`.
    pub fn standalone(config: &LoaderConfig) -> Self {
        Self::new(config, Arc::new(ManagedHeap::with_limit(config.heap_slots)))
    }

    pub fn arena(&self) -> &MetaArena {
        &self.arena
    }

    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    pub fn heap(&self) -> &ManagedHeap {
        &self.heap
    }

    /// Hand out the address of a newly created constant pool.
    pub fn next_pool_id(&self) -> PoolId {
        PoolId::new(self.next_pool.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for LoaderData {
    fn default() -> Self {
        Self::standalone(&LoaderConfig::default())
    }
}
