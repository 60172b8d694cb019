//! Destination surfaces for rasterized pages
//!
//! A [`Surface`] is the caller-owned bitmap a page is rendered into. It
//! tracks both the physical pixel buffer (RGBA, 4 bytes per pixel) and the
//! logical (CSS) size the host lays the bitmap out at; the ratio between the
//! two is the device pixel ratio of the request that produced it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a destination surface
pub type SurfaceId = u64;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Off-surface scratch bitmap a render draws into before commit
///
/// Rendering into scratch first keeps the surface in its last-good state
/// when a render is cancelled or fails partway through.
#[derive(Debug, Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Allocate a zeroed bitmap of `width` × `height` physical pixels
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Physical width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Physical height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Borrow this bitmap as a raster target with the given device pixel ratio
    pub fn target(&mut self, device_pixel_ratio: f32) -> RasterTarget<'_> {
        RasterTarget {
            width: self.width,
            height: self.height,
            device_pixel_ratio,
            pixels: &mut self.pixels,
        }
    }
}

/// Mutable view of a bitmap handed to a page backend for drawing
///
/// Carries the device pixel ratio so backends issue drawing commands in
/// logical units while filling a physical-resolution buffer.
pub struct RasterTarget<'a> {
    width: u32,
    height: u32,
    device_pixel_ratio: f32,
    pixels: &'a mut [u8],
}

impl RasterTarget<'_> {
    /// Physical width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Physical height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Ratio of physical to logical pixels for this render
    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    /// Width in logical units, as the backend's drawing commands see it
    pub fn logical_width(&self) -> f32 {
        if self.device_pixel_ratio > 0.0 {
            self.width as f32 / self.device_pixel_ratio
        } else {
            self.width as f32
        }
    }

    /// Raw RGBA pixel data
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.pixels
    }

    /// Flood the whole target with one color
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
    }
}

/// Caller-owned destination bitmap for one page
///
/// Surfaces start empty; the renderer resizes and fills them on commit.
/// Render requests die with the surface that issued them.
#[derive(Debug)]
pub struct Surface {
    id: SurfaceId,
    physical_width: u32,
    physical_height: u32,
    logical_width: u32,
    logical_height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    /// Create a new empty surface with a process-unique id
    pub fn new() -> Self {
        Self {
            id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
            physical_width: 0,
            physical_height: 0,
            logical_width: 0,
            logical_height: 0,
            pixels: Vec::new(),
        }
    }

    /// This surface's identifier
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Physical size in pixels: `(width, height)`
    pub fn physical_size(&self) -> (u32, u32) {
        (self.physical_width, self.physical_height)
    }

    /// Logical (CSS) size the host lays this surface out at
    pub fn logical_size(&self) -> (u32, u32) {
        (self.logical_width, self.logical_height)
    }

    /// Raw RGBA pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Whether nothing has been committed to this surface yet
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Replace the surface contents with a completed render
    pub(crate) fn present(&mut self, bitmap: Bitmap, logical_width: u32, logical_height: u32) {
        self.physical_width = bitmap.width;
        self.physical_height = bitmap.height;
        self.logical_width = logical_width;
        self.logical_height = logical_height;
        self.pixels = bitmap.pixels;
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_ids_are_unique() {
        let a = Surface::new();
        let b = Surface::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_new_surface_is_empty() {
        let surface = Surface::new();
        assert!(surface.is_empty());
        assert_eq!(surface.physical_size(), (0, 0));
        assert_eq!(surface.logical_size(), (0, 0));
    }

    #[test]
    fn test_present_replaces_contents() {
        let mut surface = Surface::new();

        let mut bitmap = Bitmap::new(4, 2);
        bitmap.target(2.0).fill([9, 9, 9, 255]);
        surface.present(bitmap, 2, 1);

        assert_eq!(surface.physical_size(), (4, 2));
        assert_eq!(surface.logical_size(), (2, 1));
        assert_eq!(surface.pixels().len(), 4 * 2 * 4);
        assert!(surface.pixels().iter().step_by(4).all(|&b| b == 9));
    }

    #[test]
    fn test_raster_target_logical_width() {
        let mut bitmap = Bitmap::new(200, 100);
        let target = bitmap.target(2.0);
        assert_eq!(target.logical_width(), 100.0);
        assert_eq!(target.device_pixel_ratio(), 2.0);
    }
}
