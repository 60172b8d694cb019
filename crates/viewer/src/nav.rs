//! Navigation and zoom state
//!
//! The single source of truth for mode, current page, zoom, and spread.
//! Every field is private and every mutation goes through a clamping setter,
//! so out-of-range states cannot be produced no matter which caller —
//! keyboard handler, chrome button, or virtualizer write-back — fires first.
//!
//! "Go to page" is fulfilled by whichever virtualization strategy is mounted,
//! through an optional delegate registered on mount and removed on unmount.
//! While no delegate is registered, `go_to_page` is a no-op beyond updating
//! the current page.

use std::fmt;

/// Smallest zoom scale
pub const MIN_ZOOM_SCALE: f32 = 0.5;

/// Largest zoom scale
pub const MAX_ZOOM_SCALE: f32 = 3.0;

/// Which virtualization strategy is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerMode {
    /// Continuously scrolling rows
    Vertical,

    /// Swipeable slides
    Horizontal,
}

/// Delegate the mounted virtualizer registers to fulfill `go_to_page`
pub type GoToPageFn = Box<dyn FnMut(u32) + Send>;

/// Value snapshot of the navigation state the virtualizers lay out from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavSnapshot {
    pub mode: ViewerMode,
    pub current_page: u32,
    pub num_pages: u32,
    pub zoom_scale: f32,
    pub is_spread_mode: bool,
}

impl Default for NavSnapshot {
    fn default() -> Self {
        Self {
            mode: ViewerMode::Vertical,
            current_page: 1,
            num_pages: 1,
            zoom_scale: 1.0,
            is_spread_mode: false,
        }
    }
}

/// Navigation/zoom state machine
pub struct ViewerState {
    mode: ViewerMode,
    current_page: u32,
    num_pages: u32,
    zoom_scale: f32,
    is_spread_mode: bool,
    go_to_page_impl: Option<GoToPageFn>,
    pending_resync: bool,
}

impl ViewerState {
    /// Create the state with its defaults: vertical, page 1 of 1, zoom 1.0,
    /// spread off, no delegate
    pub fn new() -> Self {
        Self {
            mode: ViewerMode::Vertical,
            current_page: 1,
            num_pages: 1,
            zoom_scale: 1.0,
            is_spread_mode: false,
            go_to_page_impl: None,
            pending_resync: false,
        }
    }

    /// Active mode
    pub fn mode(&self) -> ViewerMode {
        self.mode
    }

    /// Current page, always within `[1, num_pages]`
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Page count the state clamps against, at least 1
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Zoom scale, always within `[0.5, 3.0]`
    pub fn zoom_scale(&self) -> f32 {
        self.zoom_scale
    }

    /// Zoom as a whole percentage for display
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom_scale * 100.0).round() as u32
    }

    /// Whether two pages display together as a spread
    pub fn is_spread_mode(&self) -> bool {
        self.is_spread_mode
    }

    /// Value snapshot for the virtualizers
    pub fn snapshot(&self) -> NavSnapshot {
        NavSnapshot {
            mode: self.mode,
            current_page: self.current_page,
            num_pages: self.num_pages,
            zoom_scale: self.zoom_scale,
            is_spread_mode: self.is_spread_mode,
        }
    }

    /// Adopt the document's page count, re-clamping the current page
    ///
    /// Called once when the document session reaches ready, and again only
    /// if the count is ever corrected.
    pub fn set_num_pages(&mut self, num_pages: u32) {
        self.num_pages = num_pages.max(1);
        self.current_page = clamp_page(self.current_page, self.num_pages);
    }

    /// Record a new current page without moving the view
    ///
    /// This is the write-back path the virtualizers use for scroll- and
    /// settle-driven updates; it deliberately never invokes the delegate, so
    /// derived updates cannot feed back into another scroll.
    pub fn set_current_page(&mut self, page: u32) {
        self.current_page = clamp_page(page, self.num_pages);
    }

    /// Navigate to a page, moving the view
    ///
    /// Clamps and stores the page, then hands the clamped value to the
    /// mounted virtualizer's delegate to perform the physical scroll or
    /// slide. Without a delegate only the state updates.
    pub fn go_to_page(&mut self, page: u32) {
        let clamped = clamp_page(page, self.num_pages);
        self.current_page = clamped;
        if let Some(go) = self.go_to_page_impl.as_mut() {
            go(clamped);
        }
    }

    /// Set the zoom scale, clamped into `[0.5, 3.0]`
    pub fn set_zoom_scale(&mut self, scale: f32) {
        self.zoom_scale = scale.clamp(MIN_ZOOM_SCALE, MAX_ZOOM_SCALE);
    }

    /// Nudge the zoom by `delta`
    ///
    /// The sum is rounded to two decimals before clamping, so repeated
    /// nudges cannot accumulate float drift.
    pub fn change_zoom_by(&mut self, delta: f32) {
        let next = ((self.zoom_scale + delta) * 100.0).round() / 100.0;
        self.set_zoom_scale(next);
    }

    /// Switch the virtualization strategy
    ///
    /// The physical position resync happens when the newly mounted strategy
    /// registers its delegate: the state remembers that a resync is due and
    /// fires `go_to_page` at the current page on the next registration.
    pub fn set_mode(&mut self, mode: ViewerMode) {
        if self.mode != mode {
            self.mode = mode;
            self.pending_resync = true;
        }
    }

    /// Toggle spread display on or off
    pub fn set_spread_mode(&mut self, spread: bool) {
        self.is_spread_mode = spread;
    }

    /// Register (`Some`) or remove (`None`) the go-to-page delegate
    ///
    /// Exactly one virtualizer is mounted at a time, so at most one delegate
    /// is ever live. Registering while a mode switch left a resync pending
    /// immediately invokes the new delegate with the current page.
    pub fn set_go_to_page_impl(&mut self, go_to_page: Option<GoToPageFn>) {
        self.go_to_page_impl = go_to_page;
        if self.go_to_page_impl.is_some() && self.pending_resync {
            self.pending_resync = false;
            let page = self.current_page;
            if let Some(go) = self.go_to_page_impl.as_mut() {
                go(page);
            }
        }
    }

    /// Whether a delegate is currently registered
    pub fn has_go_to_page_impl(&self) -> bool {
        self.go_to_page_impl.is_some()
    }
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ViewerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerState")
            .field("mode", &self.mode)
            .field("current_page", &self.current_page)
            .field("num_pages", &self.num_pages)
            .field("zoom_scale", &self.zoom_scale)
            .field("is_spread_mode", &self.is_spread_mode)
            .field("has_go_to_page_impl", &self.go_to_page_impl.is_some())
            .finish()
    }
}

fn clamp_page(page: u32, num_pages: u32) -> u32 {
    page.clamp(1, num_pages.max(1))
}
