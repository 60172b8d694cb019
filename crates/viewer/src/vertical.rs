//! Continuous-scroll virtualization strategy
//!
//! Pages stack vertically in rows (one page per row, or two in spread mode)
//! inside a scrolling container. Row heights are estimated from cached
//! aspect ratios so the scroll geometry exists before any page resolves;
//! only rows near the scroll window are present in the plan at all, and only
//! pages near the current page become live canvases.
//!
//! The strategy is headless: the host feeds it container geometry and scroll
//! offsets and applies the plans it produces. It never mutates the
//! navigation state — scroll-derived page changes are returned to the host,
//! which writes them back through the clamping setter, keeping the
//! scroll/command loop free of recursion.

use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use smallvec::SmallVec;

use folio_render::DocumentBackend;
use folio_session::{DocumentSession, SizeCache};

use crate::layout::{
    fitted_page_width, plan_pages, ContainerSize, GroupLayout, PagePlan, VERTICAL_FIT,
};
use crate::nav::{NavSnapshot, ViewerState};

/// How close to the container edge counts as scrolled to the end
pub const SCROLL_EDGE_EPSILON: f32 = 2.0;

/// Continuous-scroll tuning knobs
#[derive(Debug, Clone)]
pub struct VerticalConfig {
    /// Rows kept materialized beyond the visible window on each side
    pub overscan: u32,

    /// Vertical gap between rows in logical pixels
    pub row_gap: f32,

    /// How long scroll-derived page updates stay suppressed after a jump,
    /// so the jump's own scroll events do not fight the derivation
    pub jump_cooldown: Duration,
}

impl Default for VerticalConfig {
    fn default() -> Self {
        Self {
            overscan: 2,
            row_gap: 4.0,
            jump_cooldown: Duration::from_millis(350),
        }
    }
}

impl VerticalConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overscan row count
    pub fn with_overscan(mut self, overscan: u32) -> Self {
        self.overscan = overscan;
        self
    }

    /// Set the inter-row gap
    pub fn with_row_gap(mut self, row_gap: f32) -> Self {
        self.row_gap = row_gap;
        self
    }

    /// Set the post-jump cooldown
    pub fn with_jump_cooldown(mut self, jump_cooldown: Duration) -> Self {
        self.jump_cooldown = jump_cooldown;
        self
    }
}

/// One visible row of the plan
#[derive(Debug, Clone, PartialEq)]
pub struct RowPlan {
    /// Row index, 0-based
    pub row: u32,

    /// Distance from the top of the scroll content to this row
    pub offset: f32,

    /// Estimated row height
    pub height: f32,

    /// Per-page decisions in presentation order
    pub pages: SmallVec<[PagePlan; 2]>,
}

/// Continuous-scroll virtualizer
pub struct VerticalViewer {
    config: VerticalConfig,
    container: ContainerSize,
    scroll_top: f32,
    snapshot: NavSnapshot,
    ratios: SizeCache,
    session_generation: u64,
    suppress_until: Option<Instant>,
}

impl VerticalViewer {
    /// Create a viewer with the default configuration
    pub fn new() -> Self {
        Self::with_config(VerticalConfig::default())
    }

    /// Create a viewer with a custom configuration
    pub fn with_config(config: VerticalConfig) -> Self {
        Self {
            config,
            container: ContainerSize::default(),
            scroll_top: 0.0,
            snapshot: NavSnapshot::default(),
            ratios: SizeCache::new(),
            session_generation: 0,
            suppress_until: None,
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

    /// Current scroll offset from the top of the content
    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    fn layout(&self) -> GroupLayout {
        GroupLayout::new(self.snapshot.num_pages, self.snapshot.is_spread_mode)
    }

    fn row_ratio(&self, layout: &GroupLayout, row: u32) -> f32 {
        layout
            .pages(row)
            .iter()
            .map(|&page| self.ratios.ratio_or_default(page))
            .fold(f32::MIN, f32::max)
    }

    /// Width pages are laid out at, fitted to the container and the current
    /// row's aspect ratio, then zoomed
    pub fn reader_width(&self) -> f32 {
        let layout = self.layout();
        let row = layout.group_of(self.snapshot.current_page);
        fitted_page_width(
            self.container,
            self.row_ratio(&layout, row),
            layout.pages_per_group(),
            self.snapshot.zoom_scale,
            VERTICAL_FIT,
        )
    }

    /// Natural aspect ratio of the current page, or the default estimate
    ///
    /// Surfaced for the chrome's responsive layout only.
    pub fn current_page_ratio(&self) -> f32 {
        self.ratios.ratio_or_default(self.snapshot.current_page)
    }

    /// Estimated height of `row`
    pub fn row_height(&self, row: u32) -> f32 {
        let layout = self.layout();
        (self.reader_width() * self.row_ratio(&layout, row)).ceil()
    }

    /// Offset of `row` from the top of the content
    pub fn row_offset(&self, row: u32) -> f32 {
        let mut offset = 0.0;
        for before in 0..row.min(self.layout().group_count()) {
            offset += self.row_height(before) + self.config.row_gap;
        }
        offset
    }

    /// Total scroll content height
    pub fn total_height(&self) -> f32 {
        let rows = self.layout().group_count();
        let mut height = 0.0;
        for row in 0..rows {
            height += self.row_height(row);
        }
        height + self.config.row_gap * (rows - 1) as f32
    }

    fn row_at_offset(&self, offset: f32) -> u32 {
        let layout = self.layout();
        let mut cursor = 0.0;
        for row in 0..layout.group_count() {
            let row_end = cursor + self.row_height(row);
            if offset <= row_end {
                return row;
            }
            cursor = row_end + self.config.row_gap;
        }
        layout.group_count() - 1
    }

    /// Rows intersecting the scroll window, widened by the overscan
    ///
    /// Rows outside this range are not part of the plan at all.
    pub fn visible_rows(&self) -> RangeInclusive<u32> {
        let layout = self.layout();
        let last = layout.group_count() - 1;

        let start = self.row_at_offset(self.scroll_top.max(0.0));
        let end = self.row_at_offset((self.scroll_top + self.container.usable_height()).max(0.0));

        start.saturating_sub(self.config.overscan)..=(end + self.config.overscan).min(last)
    }

    /// Materialization plan for the visible window
    pub fn plan(&self) -> Vec<RowPlan> {
        let layout = self.layout();
        let width = self.reader_width();
        let rows = self.visible_rows();

        let mut offset = self.row_offset(*rows.start());
        let mut plans = Vec::with_capacity((rows.end() - rows.start() + 1) as usize);
        for row in rows {
            let height = self.row_height(row);
            plans.push(RowPlan {
                row,
                offset,
                height,
                pages: plan_pages(&layout, row, self.snapshot.current_page, width, &self.ratios),
            });
            offset += height + self.config.row_gap;
        }
        plans
    }

    /// Planned pages whose aspect ratio has not resolved yet
    pub fn pages_needing_sizes(&self) -> Vec<u32> {
        let layout = self.layout();
        self.visible_rows()
            .flat_map(|row| layout.pages(row))
            .filter(|&page| self.ratios.ratio(page).is_none())
            .collect()
    }

    /// Resolve natural sizes for the visible window through the session
    ///
    /// A changed session generation (reopen, dispose) resets the ratio cache
    /// first, so sizes from a previous document are never applied to this
    /// one. Returns how many new ratios were recorded.
    pub fn ensure_sizes<B: DocumentBackend>(
        &mut self,
        session: &mut DocumentSession<B>,
    ) -> usize {
        if self.session_generation != session.generation() {
            log::debug!(
                "document generation changed to {}, resetting row size estimates",
                session.generation()
            );
            self.session_generation = session.generation();
            self.ratios.clear();
        }
        let pages = self.pages_needing_sizes();
        self.ratios.fill(session, pages)
    }

    /// React to a scroll event, deriving the page the viewport now shows
    ///
    /// Returns the derived current page for the host to write back through
    /// [`ViewerState::set_current_page`], or `None` while a recent jump's
    /// scroll events are still settling. At the very top and bottom the
    /// first and last page win outright; elsewhere the row whose center is
    /// closest to the viewport center decides, except that a row already
    /// containing the current page keeps it (spreads would otherwise
    /// oscillate between their two pages).
    pub fn on_scroll(&mut self, scroll_top: f32) -> Option<u32> {
        self.on_scroll_at(scroll_top, Instant::now())
    }

    fn on_scroll_at(&mut self, scroll_top: f32, now: Instant) -> Option<u32> {
        self.scroll_top = scroll_top.max(0.0);
        let layout = self.layout();

        if self.scroll_top <= SCROLL_EDGE_EPSILON {
            return Some(1);
        }

        let bottom = self.scroll_top + self.container.usable_height();
        if bottom >= self.total_height() - SCROLL_EDGE_EPSILON {
            return Some(layout.page_count());
        }

        if self.suppress_until.is_some_and(|until| now < until) {
            return None;
        }

        let center = self.scroll_top + self.container.usable_height() / 2.0;
        let rows = self.visible_rows();

        let mut best_row = *rows.start();
        let mut best_distance = f32::INFINITY;
        let mut offset = self.row_offset(*rows.start());
        for row in rows {
            let height = self.row_height(row);
            let distance = (offset + height / 2.0 - center).abs();
            if distance < best_distance {
                best_distance = distance;
                best_row = row;
            }
            offset += height + self.config.row_gap;
        }

        let pages = layout.pages(best_row);
        if pages.contains(&self.snapshot.current_page) {
            return Some(self.snapshot.current_page);
        }
        pages.iter().copied().min().or(Some(1))
    }

    /// Scroll so the row containing `page` aligns with the viewport top
    ///
    /// Starts the jump cooldown so the resulting scroll events do not feed
    /// back into the page derivation.
    pub fn scroll_to_page(&mut self, page: u32) {
        self.scroll_to_page_at(page, Instant::now());
    }

    fn scroll_to_page_at(&mut self, page: u32, now: Instant) {
        self.suppress_until = Some(now + self.config.jump_cooldown);
        let row = self.layout().group_of(page);
        let max_scroll = (self.total_height() - self.container.usable_height()).max(0.0);
        self.scroll_top = self.row_offset(row).min(max_scroll);
    }

    /// Register this viewer as the navigation delegate
    ///
    /// Called when the strategy mounts; the host unregisters with
    /// `nav.set_go_to_page_impl(None)` on unmount.
    pub fn install(viewer: &Arc<Mutex<VerticalViewer>>, nav: &mut ViewerState) {
        let handle = Arc::clone(viewer);
        nav.set_go_to_page_impl(Some(Box::new(move |page| {
            handle.lock().unwrap().scroll_to_page(page);
        })));
    }
}

impl Default for VerticalViewer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_render::testing::TestBackend;
    use folio_session::DEFAULT_PAGE_RATIO;

    /// 10 pages of 500 × 700 with every visible ratio resolved, in a
    /// 808 × 712 container: reader width 500, row height 700, row gap 4.
    fn resolved_viewer(spread: bool) -> (VerticalViewer, DocumentSession<TestBackend>) {
        let mut session = DocumentSession::open(TestBackend::with_pages(10), "memory:doc");
        let mut viewer = VerticalViewer::new();
        viewer.set_container_size(808.0, 712.0);
        viewer.sync(NavSnapshot {
            num_pages: 10,
            is_spread_mode: spread,
            ..NavSnapshot::default()
        });
        // Resolve ratios for the whole document so geometry is exact.
        for page in 1..=10 {
            let size = session.natural_size(page).expect("size");
            viewer.ratios.record(page, size.width, size.height);
        }
        viewer.session_generation = session.generation();
        (viewer, session)
    }

    #[test]
    fn reader_width_uses_resolved_ratio() {
        let (viewer, _session) = resolved_viewer(false);
        assert_eq!(viewer.reader_width(), 500.0);
        assert_eq!(viewer.row_height(0), 700.0);
        assert_eq!(viewer.total_height(), 10.0 * 700.0 + 9.0 * 4.0);
    }

    #[test]
    fn unresolved_rows_use_the_default_estimate() {
        let mut viewer = VerticalViewer::new();
        viewer.set_container_size(808.0, 712.0);
        viewer.sync(NavSnapshot {
            num_pages: 10,
            ..NavSnapshot::default()
        });

        let expected_width = (712.0_f32 - 12.0) / DEFAULT_PAGE_RATIO;
        assert!((viewer.reader_width() - expected_width).abs() < 0.01);
        assert_eq!(
            viewer.row_height(0),
            (viewer.reader_width() * DEFAULT_PAGE_RATIO).ceil()
        );
    }

    #[test]
    fn visible_rows_cover_the_window_plus_overscan() {
        let (mut viewer, _session) = resolved_viewer(false);

        viewer.scroll_top = 0.0;
        assert_eq!(viewer.visible_rows(), 0..=3);

        viewer.scroll_top = 1500.0;
        assert_eq!(viewer.visible_rows(), 0..=5);

        viewer.scroll_top = 6324.0;
        assert_eq!(viewer.visible_rows(), 6..=9);
    }

    #[test]
    fn plan_materializes_near_pages_and_boxes_the_rest() {
        let (mut viewer, _session) = resolved_viewer(false);
        viewer.snapshot.current_page = 1;

        let plan = viewer.plan();
        assert_eq!(plan[0].row, 0);
        assert_eq!(plan[0].offset, 0.0);
        assert_eq!(plan[1].offset, 704.0);

        // Pages 1..=3 are near page 1; row 3 (page 4) is a placeholder.
        assert!(plan[0].pages[0].is_canvas());
        assert!(plan[2].pages[0].is_canvas());
        assert!(!plan[3].pages[0].is_canvas());
    }

    #[test]
    fn scroll_edges_pin_first_and_last_page() {
        let (mut viewer, _session) = resolved_viewer(false);

        assert_eq!(viewer.on_scroll(0.0), Some(1));
        assert_eq!(viewer.on_scroll(1.5), Some(1));
        assert_eq!(viewer.on_scroll(6324.0), Some(10));
    }

    #[test]
    fn center_closest_row_decides_the_current_page() {
        let (mut viewer, _session) = resolved_viewer(false);

        // Center at 1856 falls closest to row 2 (center 1758).
        assert_eq!(viewer.on_scroll(1500.0), Some(3));
    }

    #[test]
    fn spread_rows_report_their_first_page() {
        let (mut viewer, _session) = resolved_viewer(true);
        viewer.snapshot.current_page = 1;

        // Rows are {1,2} {3,4} {5,6} {7,8} {9,10}; row height 700 still.
        // Center at 1060 falls closest to row 1.
        assert_eq!(viewer.on_scroll(704.0), Some(3));
    }

    #[test]
    fn settling_on_the_current_spread_is_sticky() {
        let (mut viewer, _session) = resolved_viewer(true);
        viewer.snapshot.current_page = 4;

        // Row 1 holds {3,4}; landing on it keeps page 4 current.
        assert_eq!(viewer.on_scroll(704.0), Some(4));

        viewer.snapshot.current_page = 6;
        assert_eq!(viewer.on_scroll(704.0), Some(3));
    }

    #[test]
    fn jump_cooldown_suppresses_derivation_until_it_expires() {
        let (mut viewer, _session) = resolved_viewer(false);
        let start = Instant::now();

        viewer.scroll_to_page_at(7, start);
        assert_eq!(viewer.scroll_top(), 6.0 * 704.0);

        let during = start + Duration::from_millis(100);
        assert_eq!(viewer.on_scroll_at(4224.0, during), None);

        let after = start + Duration::from_millis(400);
        assert_eq!(viewer.on_scroll_at(4224.0, after), Some(7));
    }

    #[test]
    fn scroll_edges_apply_even_during_the_cooldown() {
        let (mut viewer, _session) = resolved_viewer(false);
        let start = Instant::now();

        viewer.scroll_to_page_at(10, start);
        let during = start + Duration::from_millis(100);
        assert_eq!(viewer.on_scroll_at(6324.0, during), Some(10));
    }

    #[test]
    fn jump_clamps_to_the_maximum_scroll() {
        let (mut viewer, _session) = resolved_viewer(false);

        viewer.scroll_to_page(10);
        assert_eq!(viewer.scroll_top(), 7036.0 - 712.0);
    }

    #[test]
    fn ensure_sizes_requests_only_the_visible_window() {
        let backend = TestBackend::with_pages(40);
        let mut session = DocumentSession::open(backend.clone(), "memory:doc");

        let mut viewer = VerticalViewer::new();
        viewer.set_container_size(808.0, 712.0);
        viewer.sync(NavSnapshot {
            num_pages: 40,
            ..NavSnapshot::default()
        });

        let resolved = viewer.ensure_sizes(&mut session);
        assert_eq!(resolved as usize, backend.total_fetches());
        assert!(backend.total_fetches() < 10);
        assert_eq!(backend.fetch_count(40), 0);
    }

    #[test]
    fn ensure_sizes_resets_on_a_new_document_generation() {
        let backend = TestBackend::with_pages(10);
        let mut session = DocumentSession::open(backend.clone(), "memory:doc");

        let mut viewer = VerticalViewer::new();
        viewer.set_container_size(808.0, 712.0);
        viewer.sync(NavSnapshot {
            num_pages: 10,
            ..NavSnapshot::default()
        });

        viewer.ensure_sizes(&mut session);
        let known = viewer.ratios.len();
        assert!(known > 0);

        session.reopen("memory:other");
        viewer.ensure_sizes(&mut session);

        // The cache was rebuilt from the new document, not extended.
        assert_eq!(viewer.ratios.len(), known);
        assert_eq!(backend.fetch_count(1), 2);
    }

    #[test]
    fn delegate_jump_aligns_the_row_to_the_top() {
        let (viewer, _session) = resolved_viewer(false);
        let viewer = Arc::new(Mutex::new(viewer));
        let mut nav = ViewerState::new();
        nav.set_num_pages(10);

        VerticalViewer::install(&viewer, &mut nav);
        nav.go_to_page(7);

        assert_eq!(nav.current_page(), 7);
        assert_eq!(viewer.lock().unwrap().scroll_top(), 6.0 * 704.0);
    }
}
