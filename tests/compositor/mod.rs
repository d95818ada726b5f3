//! Component tests for the compositor core
//!
//! # Test Organization
//!
//! - `lifecycle.rs` - Staged initialization, rollback, teardown order
//! - `scheduling.rs` - Repaint coalescing and re-arming
//! - `bindings.rs` - Key bindings, modifier consumption, built-in bindings
//! - `focus.rs` - Pointer focus hit-testing and focus clearing
//! - `globals.rs` - Globals, compositor binding, surface and region creation

mod bindings;
mod focus;
mod globals;
mod lifecycle;
mod scheduling;
