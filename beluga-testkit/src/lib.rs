//! Test utilities for beluga integration tests.
//!
//! Provides [`ScriptedInvoker`], a scripted in-process stand-in for the
//! external worker process, and helpers for building job descriptors.

pub mod descriptor;
pub mod invoker;

pub use descriptor::*;
pub use invoker::*;
