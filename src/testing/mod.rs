//! Testing infrastructure for the compositor
//!
//! Integration tests run the real initialization path on the headless
//! platform:
//!
//! 1. **HeadlessPlatform** provides virtual outputs, a counting renderer and
//!    a ledger of every acquisition and release.
//!
//! 2. **Fixture** owns the event loop and the compositor and injects input,
//!    VT and page-flip events.
//!
//! 3. **TestClient** stands in for a client connection and records protocol
//!    errors posted to it. **TestLayout** is a fixed keymap that needs no
//!    system keyboard data.
//!
//! # Example
//!
//! ```ignore
//! use tern_core::testing::Fixture;
//!
//! #[test]
//! fn test_repaint() {
//!     let mut fixture = Fixture::new().unwrap();
//!     let output = fixture.output_ids()[0];
//!     fixture.compositor_mut().schedule_repaint(output);
//!     fixture.dispatch();
//!     assert_eq!(fixture.render_count(output), 1);
//! }
//! ```

mod client;
mod fixture;
mod layout;

pub use client::TestClient;
pub use fixture::Fixture;
pub use layout::{keycodes, TestLayout};
