//! Lazily-discovered page aspect ratios
//!
//! Page aspect ratios are unknown until the page is fetched, so layout runs
//! on an A4-like default estimate first. The cache is monotonic: an entry
//! only ever goes absent → present and is never invalidated, because pages
//! are assumed to never change size. The one-time layout shift when the real
//! ratio lands is accepted and bounded.

use std::collections::HashMap;

use folio_render::DocumentBackend;

use crate::session::DocumentSession;

/// Aspect ratio assumed for pages whose natural size is not yet known
pub const DEFAULT_PAGE_RATIO: f32 = 1.4142;

/// Monotonic `page index → aspect ratio (height / width)` cache
#[derive(Debug, Clone, Default)]
pub struct SizeCache {
    ratios: HashMap<u32, f32>,
}

impl SizeCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The known ratio of `page`, if it resolved
    pub fn ratio(&self, page: u32) -> Option<f32> {
        self.ratios.get(&page).copied()
    }

    /// The known ratio of `page`, or the default estimate
    pub fn ratio_or_default(&self, page: u32) -> f32 {
        self.ratio(page).unwrap_or(DEFAULT_PAGE_RATIO)
    }

    /// Record a resolved natural size
    ///
    /// Non-positive widths are ignored, and a present entry is never
    /// overwritten. Returns `true` when a new ratio was stored.
    pub fn record(&mut self, page: u32, width: f32, height: f32) -> bool {
        if width <= 0.0 || self.ratios.contains_key(&page) {
            return false;
        }
        self.ratios.insert(page, height / width);
        true
    }

    /// Resolve ratios for `pages` through the session
    ///
    /// A page whose size fetch fails is logged and skipped; its siblings are
    /// unaffected. Returns how many new ratios were recorded.
    pub fn fill<B: DocumentBackend>(
        &mut self,
        session: &mut DocumentSession<B>,
        pages: impl IntoIterator<Item = u32>,
    ) -> usize {
        let mut resolved = 0;
        for page in pages {
            if self.ratios.contains_key(&page) {
                continue;
            }
            match session.natural_size(page) {
                Ok(size) => {
                    if self.record(page, size.width, size.height) {
                        resolved += 1;
                    }
                }
                Err(err) => {
                    log::warn!("natural size for page {page} unavailable: {err}");
                }
            }
        }
        resolved
    }

    /// Number of resolved ratios
    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    /// Whether no ratio has resolved yet
    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    /// Forget everything; only called when the document itself changes
    pub fn clear(&mut self) {
        self.ratios.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_render::testing::TestBackend;
    use folio_render::PageViewport;

    #[test]
    fn test_unknown_pages_use_default_ratio() {
        let cache = SizeCache::new();
        assert_eq!(cache.ratio(3), None);
        assert_eq!(cache.ratio_or_default(3), DEFAULT_PAGE_RATIO);
    }

    #[test]
    fn test_record_is_monotonic() {
        let mut cache = SizeCache::new();

        assert!(cache.record(1, 500.0, 700.0));
        assert_eq!(cache.ratio(1), Some(1.4));

        // A second resolution never replaces the first.
        assert!(!cache.record(1, 100.0, 300.0));
        assert_eq!(cache.ratio(1), Some(1.4));
    }

    #[test]
    fn test_record_ignores_non_positive_width() {
        let mut cache = SizeCache::new();
        assert!(!cache.record(1, 0.0, 700.0));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fill_skips_failing_pages() {
        let backend = TestBackend::with_page_sizes(vec![
            PageViewport::new(500.0, 700.0),
            PageViewport::new(400.0, 400.0),
            PageViewport::new(500.0, 700.0),
        ])
        .with_failing_page(2);
        let mut session = DocumentSession::open(backend, "memory:doc");

        let mut cache = SizeCache::new();
        let resolved = cache.fill(&mut session, 1..=3);

        assert_eq!(resolved, 2);
        assert_eq!(cache.ratio(1), Some(1.4));
        assert_eq!(cache.ratio(2), None);
        assert_eq!(cache.ratio(3), Some(1.4));
    }

    #[test]
    fn test_fill_does_not_refetch_known_pages() {
        let backend = TestBackend::with_pages(3);
        let mut session = DocumentSession::open(backend.clone(), "memory:doc");

        let mut cache = SizeCache::new();
        cache.fill(&mut session, [1, 2]);
        cache.fill(&mut session, [1, 2, 3]);

        assert_eq!(backend.fetch_count(1), 1);
        assert_eq!(backend.fetch_count(2), 1);
        assert_eq!(cache.len(), 3);
    }
}
