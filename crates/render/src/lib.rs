//! Folio Render Library
//!
//! Page rasterization pipeline: the document transport contract, destination
//! surfaces, and a renderer with per-surface cooperative cancellation.

pub mod backend;
pub mod cancel;
pub mod renderer;
pub mod surface;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use backend::{
    BackendError, DocumentBackend, DocumentHandle, PageHandle, PageViewport, RenderError,
};
pub use cancel::{CancellationToken, SurfaceRenders};
pub use renderer::{
    PageRenderer, RenderOutcome, RenderRequest, RendererConfig, DEFAULT_MARGIN, MIN_FIT_SCALE,
};
pub use surface::{Bitmap, RasterTarget, Surface, SurfaceId};
