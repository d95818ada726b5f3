//! Tracy profiling hooks
//!
//! The macros compile to no-ops unless the `profile-with-tracy` feature is
//! enabled. The repaint job opens a span and page-flip completion marks a
//! frame, so a Tracy capture shows one frame per vertical blank:
//!
//! ```ignore
//! fn repaint_output(&mut self, id: OutputId) {
//!     tracy_span!("repaint_output");
//!     // ...
//! }
//! ```

/// Open a Tracy span covering the rest of the current scope.
#[macro_export]
#[cfg(feature = "profile-with-tracy")]
macro_rules! tracy_span {
    ($name:expr) => {
        let _span = tracy_client::span!($name);
    };
}

#[macro_export]
#[cfg(not(feature = "profile-with-tracy"))]
macro_rules! tracy_span {
    ($name:expr) => {};
}

/// Mark a frame boundary (one per completed page flip).
#[macro_export]
#[cfg(feature = "profile-with-tracy")]
macro_rules! tracy_frame_mark {
    () => {
        if let Some(client) = tracy_client::Client::running() {
            client.frame_mark();
        }
    };
}

#[macro_export]
#[cfg(not(feature = "profile-with-tracy"))]
macro_rules! tracy_frame_mark {
    () => {};
}
