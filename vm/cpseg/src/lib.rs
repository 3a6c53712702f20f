//! Specialized constant-pool segments.
//!
//! A loaded class's constant pool can carry several runtime-selected
//! variants of a subset of its constants, each bound to an argument such
//! as a concrete type. This crate lays those variants out and allocates
//! them:
//!
//! - **Layout** ([`measure`], [`place`]): turn a set of constant-pool
//!   indices into byte-exact offsets before anything is allocated, then
//!   reproduce the same offsets into the allocated shape
//! - **Shapes** ([`ShapeDescriptor`], [`Shape`]): the frozen layout shared
//!   by every segment of one kind, plus a blank template segment
//! - **Segments** ([`SegmentInstance`]): one bound variant, a metadata
//!   block plus a rooted heap reference array
//! - **Registration**: each pool keeps one lock shared by all its shapes;
//!   creating a segment only holds it to splice the new node onto the
//!   shape's list
//!
//! # Failure Model
//!
//! Creating a segment allocates from the managed heap first and the
//! metadata arena second. If the second allocation fails the first is
//! released before the error propagates, so a failed call leaves no
//! registered segment and no rooted array behind.

mod error;
mod layout;
mod pool;
mod registry;
mod segment;
mod shape;

pub use error::{LayoutError, SegmentError};
pub use layout::{measure, place, Layout, Offsets, ShapeRequest};
pub use pool::ConstantPool;
pub use segment::{SegmentInstance, SegmentTemplate};
pub use shape::{Segments, Shape, ShapeDescriptor};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `RUST_LOG`-filtered subscriber for this crate's events.
///
/// `allocate_shape` and `create_segment` open `debug` spans carrying the
/// segment number and kind (`allocate_shape` adds the pool). Layout
/// measurement, block rollback and instance registration log `debug`
/// events inside them, and each span logs its duration on close.
/// Relocation walks log `iter(..)` events at `trace`.
///
/// Does nothing unless `RUST_LOG` is set, e.g. `RUST_LOG=cpseg=debug`.
/// Later calls are no-ops.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::fmt::format::FmtSpan;
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .with(filter)
                .init();
        }
    });
}
