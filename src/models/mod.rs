//! Request and response values of the file URL calls.
//!
//! None of these are persisted; each one lives for a single call.

pub mod intent;
