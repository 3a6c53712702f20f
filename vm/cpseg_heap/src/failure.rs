//! Allocation failure signals.

/// Why an arena or heap allocation could not be satisfied.
///
/// Every variant is propagated the same way: the caller undoes whatever it
/// already committed and returns the failure unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocFailure {
    /// The class-loading unit's metadata budget is spent.
    #[error("metaspace exhausted: requested {requested} words, {available} available")]
    MetaspaceExhausted { requested: usize, available: usize },
    /// The managed heap cannot hold another array of this length.
    #[error("heap exhausted: requested {requested} slots, {available} available")]
    HeapExhausted { requested: usize, available: usize },
    /// An asynchronous termination request surfaced during allocation.
    #[error("asynchronous termination requested during allocation")]
    AsyncTermination,
}

/// How an injected one-shot failure presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Report exhaustion of the allocator's budget.
    Exhausted,
    /// Report an asynchronous termination signal.
    Terminated,
}
