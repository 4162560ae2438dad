//! Output utilities for CLI commands
//!
//! Spinners with elapsed time for long-running host operations and
//! consistent run-state colors.

pub mod colors;
pub mod spinner;

pub use colors::state_style;
pub use spinner::CommandSpinner;
