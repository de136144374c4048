//! Stack growth for the recursive passes.
//!
//! Parsing, resolution, printing and evaluation all recurse once per level
//! of syntactic nesting.  Each of those entry points runs its body through
//! [`ensure_sufficient_stack`], which switches to a freshly allocated
//! segment when the current one runs low.

/// Remaining stack below which a new segment is allocated.
const RED_ZONE: usize = 100 * 1024;

/// Size of each extra stack segment.
const STACK_GROWTH: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_GROWTH, f)
}
