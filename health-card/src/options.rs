//! # Options
//!
//! Settings threaded through every pipeline stage.

use std::sync::Arc;

use chrono::Utc;
use shc_core::codec::DEFAULT_DEFLATE_LEVEL;
use shc_jose::{Backend, Checks};

use crate::render::{QrRenderer, QrScanner};

/// Pipeline settings.
#[derive(Clone, Debug)]
pub struct Options {
    /// Continue to the next stage after a stage succeeds.
    pub chain: bool,

    /// Raw-DEFLATE level (0-9) used when encoding payloads.
    pub deflate_level: u32,

    /// How signatures are handed to the ECDSA primitive.
    pub backend: Backend,

    /// Key validation settings applied when signing and verifying. Directory
    /// validation takes its own [`shc_directory::Policy`].
    pub checks: Checks,

    /// Fixed "now" in epoch seconds, used instead of the system clock.
    pub now: Option<i64>,

    /// Reads QR images. Required to decode QR artifacts.
    pub scanner: Option<Arc<dyn QrScanner>>,

    /// Renders QR images. Defaults to PNG rendering when the `qr` feature is
    /// enabled.
    pub renderer: Option<Arc<dyn QrRenderer>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            chain: true,
            deflate_level: DEFAULT_DEFLATE_LEVEL,
            backend: Backend::default(),
            checks: Checks::default(),
            now: None,
            scanner: None,
            renderer: None,
        }
    }
}

impl Options {
    /// The current time in epoch seconds.
    #[must_use]
    pub fn now(&self) -> i64 {
        self.now.unwrap_or_else(|| Utc::now().timestamp())
    }

    /// Use `scanner` to read QR images.
    #[must_use]
    pub fn with_scanner(mut self, scanner: impl QrScanner + 'static) -> Self {
        self.scanner = Some(Arc::new(scanner));
        self
    }

    /// Use `renderer` to produce QR images.
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl QrRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }
}
