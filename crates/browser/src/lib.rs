//! tagwatch browser collaborators
//!
//! The pieces the core pipeline keeps behind trait boundaries:
//!
//! - [`PlaywrightSession`] — a persistent node process running Playwright
//!   chromium, driven over a JSON line protocol. Implements the core's
//!   `PreviewPage` (observation capture + screenshots) and `ActionDriver`
//!   (scripted actions) traits.
//! - [`ArrowAnnotator`] — draws validation callouts onto screenshots.
//!
//! Requires node with Playwright installed
//! (`npx playwright install chromium`).

pub mod annotate;
pub mod driver;
pub mod error;
pub mod page;
pub mod probes;
pub mod protocol;

pub use annotate::ArrowAnnotator;
pub use driver::{BrowserConfig, PlaywrightSession};
pub use error::{BrowserError, BrowserResult};
