//! Class-loading unit collaborators for constant-pool segments.
//!
//! The segment core allocates from two independent places and must stay
//! consistent when either fails:
//!
//! - **Metadata arena** ([`MetaArena`]): non-relocating, word-granular,
//!   lives as long as its class-loading unit
//! - **Managed heap** ([`ManagedHeap`]): reference arrays reached through
//!   durable handles ([`HandleTable`], [`OopHandle`])
//!
//! [`LoaderData`] bundles one arena and one handle table with a shared
//! heap. [`VmThread`] carries the asynchronous termination signal that any
//! allocation may observe. [`MetaspaceClosure`] is the visitor interface a
//! compaction or snapshot pass uses to walk metadata links.
//!
//! # Failure Injection
//!
//! Both allocators accept a one-shot [`FailPoint`] so callers can drive
//! every failure path deterministically.

mod arena;
mod closure;
mod config;
mod failure;
mod handles;
mod heap;
mod loader;
mod thread;

pub use arena::{MetaArena, MetaBlock, MetaKind};
pub use closure::{MetaAddr, MetaRef, MetaspaceClosure, PointerCollector, Relocator};
pub use config::{LoaderConfig, HEAP_SLOTS_ENV, METASPACE_WORDS_ENV};
pub use failure::{AllocFailure, FailPoint};
pub use handles::{HandleTable, OopHandle};
pub use heap::{ArrayRef, HeapRef, ManagedHeap, ObjectRef};
pub use loader::LoaderData;
pub use thread::VmThread;
