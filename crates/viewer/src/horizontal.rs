//! Paginated-slide virtualization strategy
//!
//! Pages group into slides exactly like the vertical strategy's rows, but
//! instead of continuous scroll the host snaps between slides with a drag
//! gesture. There is no looping: slide 0 and the last slide are hard ends.
//!
//! Headless like its vertical sibling: drag settles come in through
//! [`select_slide`](HorizontalViewer::select_slide), which returns the page
//! to write back into the navigation state; programmatic jumps arrive
//! through the registered delegate.

use std::sync::{Arc, Mutex};

use smallvec::SmallVec;

use folio_render::DocumentBackend;
use folio_session::{DocumentSession, SizeCache};

use crate::layout::{
    fitted_page_width, near_window, plan_pages, ContainerSize, GroupLayout, PagePlan,
    HORIZONTAL_FIT,
};
use crate::nav::{NavSnapshot, ViewerState};

/// How the slide mechanism should move to a newly selected slide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideTransition {
    /// Snap directly, no animation; used for the initial mount sync
    Jump,

    /// Animate the transition
    Smooth,
}

/// One slide of the plan
#[derive(Debug, Clone, PartialEq)]
pub struct SlidePlan {
    /// Slide index, 0-based
    pub slide: u32,

    /// Per-page decisions in presentation order
    pub pages: SmallVec<[PagePlan; 2]>,
}

/// Paginated-slide virtualizer
pub struct HorizontalViewer {
    container: ContainerSize,
    snapshot: NavSnapshot,
    ratios: SizeCache,
    session_generation: u64,
    selected_slide: u32,
    synced_once: bool,
}

impl HorizontalViewer {
    /// Create a viewer at slide 0
    pub fn new() -> Self {
        Self {
            container: ContainerSize::default(),
            snapshot: NavSnapshot::default(),
            ratios: SizeCache::new(),
            session_generation: 0,
            selected_slide: 0,
            synced_once: false,
        }
    }

    /// Adopt the latest navigation state
    pub fn sync(&mut self, snapshot: NavSnapshot) {
        self.snapshot = snapshot;
    }

    /// Record the measured container geometry
    pub fn set_container_size(&mut self, width: f32, height: f32) {
        self.container = ContainerSize::new(width, height);
    }

    fn layout(&self) -> GroupLayout {
        GroupLayout::new(self.snapshot.num_pages, self.snapshot.is_spread_mode)
    }

    /// Width pages are laid out at, fitted to the container and the current
    /// page's aspect ratio, then zoomed
    pub fn page_width(&self) -> f32 {
        let layout = self.layout();
        fitted_page_width(
            self.container,
            self.ratios.ratio_or_default(self.snapshot.current_page),
            layout.pages_per_group(),
            self.snapshot.zoom_scale,
            HORIZONTAL_FIT,
        )
    }

    /// Natural aspect ratio of the current page, or the default estimate
    ///
    /// Surfaced for the chrome's responsive layout only.
    pub fn current_page_ratio(&self) -> f32 {
        self.ratios.ratio_or_default(self.snapshot.current_page)
    }

    /// Number of slides
    pub fn slide_count(&self) -> u32 {
        self.layout().group_count()
    }

    /// The slide the view currently shows
    pub fn selected_slide(&self) -> u32 {
        self.selected_slide
    }

    /// Settle on a slide after a drag
    ///
    /// The index is clamped to the ends — dragging past the last slide does
    /// not wrap. Returns the page to record as current: the slide's first
    /// page, unless the slide already shows the current page, which stays to
    /// avoid the page number flickering while a spread is viewed.
    pub fn select_slide(&mut self, slide: u32) -> u32 {
        let layout = self.layout();
        let slide = slide.min(layout.group_count() - 1);
        self.selected_slide = slide;

        if layout.is_spread() && layout.contains(slide, self.snapshot.current_page) {
            return self.snapshot.current_page;
        }
        layout.first_page(slide).min(layout.page_count())
    }

    /// Move directly to the slide containing `page`
    ///
    /// The first jump after mount is the initial position sync and snaps
    /// without animation; later jumps animate.
    pub fn jump_to_page(&mut self, page: u32) -> SlideTransition {
        self.selected_slide = self.layout().group_of(page);
        if self.synced_once {
            SlideTransition::Smooth
        } else {
            self.synced_once = true;
            SlideTransition::Jump
        }
    }

    /// Materialization plan for every slide
    ///
    /// Slides keep their place in the strip, so all of them are planned, but
    /// only pages inside the near window come back as canvases.
    pub fn plan(&self) -> Vec<SlidePlan> {
        let layout = self.layout();
        let width = self.page_width();

        (0..layout.group_count())
            .map(|slide| SlidePlan {
                slide,
                pages: plan_pages(
                    &layout,
                    slide,
                    self.snapshot.current_page,
                    width,
                    &self.ratios,
                ),
            })
            .collect()
    }

    /// Pages around the current page whose aspect ratio has not resolved
    ///
    /// Bounded to the near-window neighborhood so a long document does not
    /// trigger a full-document size sweep.
    pub fn pages_needing_sizes(&self) -> Vec<u32> {
        let radius = near_window(self.snapshot.is_spread_mode);
        let current = self.snapshot.current_page;
        let last = self.snapshot.num_pages.max(1);

        (current.saturating_sub(radius).max(1)..=current.saturating_add(radius).min(last))
            .filter(|&page| self.ratios.ratio(page).is_none())
            .collect()
    }

    /// Resolve natural sizes for the neighborhood through the session
    ///
    /// Same generation gating as the vertical strategy: a reopened document
    /// resets the ratio cache before anything new is recorded.
    pub fn ensure_sizes<B: DocumentBackend>(
        &mut self,
        session: &mut DocumentSession<B>,
    ) -> usize {
        if self.session_generation != session.generation() {
            log::debug!(
                "document generation changed to {}, resetting slide size estimates",
                session.generation()
            );
            self.session_generation = session.generation();
            self.ratios.clear();
        }
        let pages = self.pages_needing_sizes();
        self.ratios.fill(session, pages)
    }

    /// Register this viewer as the navigation delegate
    pub fn install(viewer: &Arc<Mutex<HorizontalViewer>>, nav: &mut ViewerState) {
        let handle = Arc::clone(viewer);
        nav.set_go_to_page_impl(Some(Box::new(move |page| {
            handle.lock().unwrap().jump_to_page(page);
        })));
    }
}

impl Default for HorizontalViewer {
    fn default() -> Self {
        Self::new()
    }
}
