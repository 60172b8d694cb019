//! Document transport contract
//!
//! The viewer never talks to a concrete document engine or network layer;
//! it consumes this capability set and any transport that implements it is
//! substitutable. Page indices are 1-based throughout, matching the
//! session's public numbering.

use crate::cancel::CancellationToken;
use crate::surface::RasterTarget;

/// Page dimensions at a given scale, in device-independent pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    pub width: f32,
    pub height: f32,
}

impl PageViewport {
    /// Create a new viewport
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Aspect ratio (height over width) of this viewport
    ///
    /// Returns `None` when the width is not positive, so callers fall back
    /// to their layout estimate instead of propagating a NaN.
    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.width > 0.0 {
            Some(self.height / self.width)
        } else {
            None
        }
    }
}

/// Errors reported by a document transport
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The document could not be opened
    #[error("failed to open document: {0}")]
    Open(String),

    /// An individual page could not be fetched
    #[error("failed to fetch page {index}: {reason}")]
    Page { index: u32, reason: String },

    /// The native document resource could not be released
    #[error("failed to release document resource: {0}")]
    Release(String),
}

/// Errors reported by page rasterization
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// The render was superseded or the page left the viewport mid-raster.
    /// This is the expected outcome of cancellation, not a failure.
    #[error("rendering cancelled")]
    Cancelled,

    /// Rasterization failed for any other reason
    #[error("rasterization failed: {0}")]
    Raster(String),
}

/// Entry point of a document transport: opens documents by locator
pub trait DocumentBackend {
    type Document: DocumentHandle;

    /// Open the document behind `locator`
    fn open(&self, locator: &str) -> Result<Self::Document, BackendError>;
}

/// An open native document
pub trait DocumentHandle {
    type Page: PageHandle;

    /// Number of pages in the document
    fn page_count(&self) -> u32;

    /// Fetch the handle for a page, 1-based
    fn page(&self, index: u32) -> Result<Self::Page, BackendError>;

    /// Release the native resource backing this document
    ///
    /// Best-effort: callers log a failure and move on, they never surface it.
    fn close(&mut self) -> Result<(), BackendError>;
}

/// An opaque reference to one page of an open document
pub trait PageHandle {
    /// Page dimensions at `scale` (`1.0` gives the natural size)
    fn viewport(&self, scale: f32) -> PageViewport;

    /// Rasterize this page into `target` at the dimensions of `viewport`
    ///
    /// Cooperative: implementations should poll `token` at reasonable
    /// intervals and bail out with [`RenderError::Cancelled`] once it trips.
    /// The target carries the device pixel ratio so drawing is issued in
    /// logical units.
    fn render(
        &self,
        target: &mut RasterTarget<'_>,
        viewport: &PageViewport,
        token: &CancellationToken,
    ) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_guards_non_positive_width() {
        let portrait = PageViewport::new(500.0, 700.0);
        assert_eq!(portrait.aspect_ratio(), Some(1.4));

        let degenerate = PageViewport::new(0.0, 700.0);
        assert_eq!(degenerate.aspect_ratio(), None);
    }
}
