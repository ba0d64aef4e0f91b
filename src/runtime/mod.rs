//! Single-writer async queue loop and event stream APIs.

/// Event stream types emitted by the queue loop.
pub mod events;
/// Handle and command loop implementation.
pub mod handle;
