//! CDP browser automation.
//!
//! Provides a single-use browser session for fetching rendered page text.
//! Requires Chrome/Chromium installed.

pub mod session;

pub use session::BrowserSession;
