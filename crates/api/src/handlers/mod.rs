//! Request handlers.

pub mod sync;
