//! Page rasterization with per-surface cancellation
//!
//! The renderer fits a page to a requested logical width, rasterizes it at
//! the device pixel ratio into a scratch bitmap, and commits the result to
//! the destination surface. Per surface there is at most one render in
//! flight: a new request cancels its predecessor before starting, and a
//! cancelled render never commits, so completions are effectively applied
//! in issue order.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::backend::{PageHandle, RenderError};
use crate::cancel::SurfaceRenders;
use crate::surface::{Bitmap, Surface, SurfaceId};

/// Horizontal margin subtracted from the target width before fitting
pub const DEFAULT_MARGIN: f32 = 8.0;

/// Lower bound on the fit scale, guarding non-positive target widths
pub const MIN_FIT_SCALE: f32 = 0.1;

/// Renderer tuning knobs
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Logical pixels reserved around the page inside the target width
    pub margin: f32,

    /// Smallest fit scale a request can resolve to
    pub min_scale: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
            min_scale: MIN_FIT_SCALE,
        }
    }
}

impl RendererConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fitting margin
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Set the minimum fit scale
    pub fn with_min_scale(mut self, min_scale: f32) -> Self {
        self.min_scale = min_scale;
        self
    }
}

/// One render request for a destination surface
///
/// Two requests comparing equal produce identical pixels, which is what the
/// renderer's unchanged-input skip relies on. `document_generation` ties the
/// request to the session generation that produced the page handle, so a
/// reopened document invalidates previous completions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// 1-based page index, part of the request identity
    pub page_index: u32,

    /// Target width in logical pixels the page is fitted to
    pub target_width: f32,

    /// Extra scale multiplier applied on top of the fit scale
    pub scale: f32,

    /// Physical pixels per logical pixel
    pub device_pixel_ratio: f32,

    /// Session generation the page handle was fetched under
    pub document_generation: u64,
}

impl RenderRequest {
    /// Create a request with scale 1.0 and device pixel ratio 1.0
    pub fn new(page_index: u32, target_width: f32) -> Self {
        Self {
            page_index,
            target_width,
            scale: 1.0,
            device_pixel_ratio: 1.0,
            document_generation: 0,
        }
    }

    /// Set the extra scale multiplier
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Set the device pixel ratio
    pub fn with_device_pixel_ratio(mut self, ratio: f32) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    /// Set the session generation this request belongs to
    pub fn with_document_generation(mut self, generation: u64) -> Self {
        self.document_generation = generation;
        self
    }
}

/// How a render request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The surface now shows this request's pixels
    Rendered,

    /// The surface already showed this exact request; nothing was done
    Unchanged,

    /// The request had no usable target width yet; nothing was done
    Skipped,

    /// The render was cancelled mid-flight; the surface kept its previous
    /// contents. Expected whenever a page scrolls away or is re-requested
    /// at a new size.
    Cancelled,
}

/// Rasterizes pages into surfaces
pub struct PageRenderer {
    config: RendererConfig,
    active: SurfaceRenders,
    completed: Mutex<HashMap<SurfaceId, RenderRequest>>,
}

impl PageRenderer {
    /// Create a renderer with the default configuration
    pub fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    /// Create a renderer with a custom configuration
    pub fn with_config(config: RendererConfig) -> Self {
        Self {
            config,
            active: SurfaceRenders::new(),
            completed: Mutex::new(HashMap::new()),
        }
    }

    /// Render `page` into `surface` as described by `request`
    ///
    /// The fit scale is `(target_width − margin) / intrinsic_width`, floored
    /// at the configured minimum; the physical buffer is the fitted viewport
    /// times the device pixel ratio and the logical size is the fitted
    /// viewport rounded down.
    ///
    /// Cancellation is not an error: a superseded or scrolled-away render
    /// returns [`RenderOutcome::Cancelled`] and leaves the surface in its
    /// last-good state. Real rasterization failures propagate after a log,
    /// also leaving the surface untouched, and the request stays retryable.
    pub fn render<P: PageHandle>(
        &self,
        page: &P,
        request: &RenderRequest,
        surface: &mut Surface,
    ) -> Result<RenderOutcome, RenderError> {
        if request.target_width <= 0.0 {
            return Ok(RenderOutcome::Skipped);
        }

        if self.completed.lock().unwrap().get(&surface.id()) == Some(request) {
            return Ok(RenderOutcome::Unchanged);
        }

        let token = self.active.begin(surface.id());

        let intrinsic = page.viewport(1.0);
        if intrinsic.width <= 0.0 {
            self.active.finish(surface.id(), &token);
            return Err(RenderError::Raster(format!(
                "page {} reports a non-positive intrinsic width",
                request.page_index
            )));
        }

        let fit_scale = ((request.target_width - self.config.margin) / intrinsic.width)
            .max(self.config.min_scale);
        let viewport = page.viewport(fit_scale * request.scale);

        let ratio = request.device_pixel_ratio;
        let mut scratch = Bitmap::new(
            (viewport.width * ratio).floor() as u32,
            (viewport.height * ratio).floor() as u32,
        );

        let result = page.render(&mut scratch.target(ratio), &viewport, &token);
        self.active.finish(surface.id(), &token);

        match result {
            Err(RenderError::Cancelled) => {
                log::debug!(
                    "render of page {} cancelled before completion",
                    request.page_index
                );
                Ok(RenderOutcome::Cancelled)
            }
            Err(err) => {
                log::warn!("render of page {} failed: {err}", request.page_index);
                Err(err)
            }
            Ok(()) => {
                if token.is_cancelled() {
                    // Superseded while rasterizing: the surface belongs to
                    // the newer request now.
                    log::debug!(
                        "render of page {} superseded, discarding completion",
                        request.page_index
                    );
                    return Ok(RenderOutcome::Cancelled);
                }

                surface.present(
                    scratch,
                    viewport.width.floor() as u32,
                    viewport.height.floor() as u32,
                );
                self.completed
                    .lock()
                    .unwrap()
                    .insert(surface.id(), *request);
                Ok(RenderOutcome::Rendered)
            }
        }
    }

    /// Cancel the render currently in flight for `surface_id`, if any
    pub fn cancel(&self, surface_id: SurfaceId) -> bool {
        self.active.cancel(surface_id)
    }

    /// Cancel every in-flight render; returns how many were cancelled
    pub fn cancel_all(&self) -> usize {
        self.active.cancel_all()
    }

    /// Drop all bookkeeping for a surface that no longer exists
    pub fn forget(&self, surface_id: SurfaceId) {
        self.active.cancel(surface_id);
        self.completed.lock().unwrap().remove(&surface_id);
    }
}

impl Default for PageRenderer {
    fn default() -> Self {
        Self::new()
    }
}
