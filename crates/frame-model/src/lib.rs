//! Video Snapper Frame Model
//!
//! Defines the data contracts shared by the capture engine and its callers:
//! - **Formats:** The closed set of still-image formats a snapshot can be
//!   encoded to, with their mime types and file extensions
//! - **Frames:** Decoded video frames as handed over by a playback surface
//! - **Captures:** The transient outcome of one capture request
//! - **Session:** Read-only snapshots of session state for views and tests

pub mod capture;
pub mod format;
pub mod frame;
pub mod session;

pub use capture::*;
pub use format::*;
pub use frame::*;
pub use session::*;
