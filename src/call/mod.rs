//! Deferred calls and their result futures.
//!
//! - [`DeferredCall`]: callable + captured arguments, executed exactly once
//! - [`ResultSlot`]: write-once outcome storage
//! - [`CallFuture`]: the handle a caller blocks on

pub mod deferred;
pub mod result_slot;

pub use deferred::{BoxedCall, Deferred, DeferredCall};
pub use result_slot::{CallFuture, ResultSlot};
