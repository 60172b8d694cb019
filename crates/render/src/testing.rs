//! Deterministic in-memory transport for tests
//!
//! `TestBackend` implements the transport contract with configurable page
//! sizes, fetch counters, and failure/cancellation injection, so the session
//! and the virtualizers can be exercised end to end without a real document
//! engine. Enabled for downstream crates via the `test-support` feature.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{
    BackendError, DocumentBackend, DocumentHandle, PageHandle, PageViewport, RenderError,
};
use crate::cancel::CancellationToken;
use crate::surface::RasterTarget;

/// Fill color a test page renders with, derived from its index
pub fn page_shade(index: u32) -> [u8; 4] {
    let value = (index % 251) as u8;
    [value, value, value, 0xFF]
}

/// Configurable in-memory document backend
#[derive(Clone)]
pub struct TestBackend {
    page_sizes: Vec<PageViewport>,
    open_error: Option<String>,
    failing_pages: HashSet<u32>,
    close_error: bool,
    opened: Arc<Mutex<Vec<String>>>,
    page_fetches: Arc<Mutex<Vec<u32>>>,
    cancel_next_render: Arc<AtomicBool>,
}

impl TestBackend {
    /// Backend serving `count` identical 500 × 700 pages
    pub fn with_pages(count: u32) -> Self {
        Self::with_page_sizes(vec![PageViewport::new(500.0, 700.0); count as usize])
    }

    /// Backend serving pages with the given natural sizes
    pub fn with_page_sizes(page_sizes: Vec<PageViewport>) -> Self {
        Self {
            page_sizes,
            open_error: None,
            failing_pages: HashSet::new(),
            close_error: false,
            opened: Arc::new(Mutex::new(Vec::new())),
            page_fetches: Arc::new(Mutex::new(Vec::new())),
            cancel_next_render: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Backend whose every open fails with `message`
    pub fn failing_open(message: &str) -> Self {
        let mut backend = Self::with_pages(0);
        backend.open_error = Some(message.to_string());
        backend
    }

    /// Make fetches of page `index` fail
    pub fn with_failing_page(mut self, index: u32) -> Self {
        self.failing_pages.insert(index);
        self
    }

    /// Make the document's close report a failure
    pub fn with_close_error(mut self) -> Self {
        self.close_error = true;
        self
    }

    /// Cancel the token of the next render issued through any page
    ///
    /// Simulates an external cancellation arriving while rasterization is
    /// underway: the page trips its own token and bails out cooperatively.
    pub fn cancel_next_render(&self) {
        self.cancel_next_render.store(true, Ordering::SeqCst);
    }

    /// Locators passed to `open`, in order
    pub fn opened_locators(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    /// How many times page `index` was fetched
    pub fn fetch_count(&self, index: u32) -> usize {
        self.page_fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|fetched| **fetched == index)
            .count()
    }

    /// Total page fetches across all indices
    pub fn total_fetches(&self) -> usize {
        self.page_fetches.lock().unwrap().len()
    }
}

impl DocumentBackend for TestBackend {
    type Document = TestDocument;

    fn open(&self, locator: &str) -> Result<TestDocument, BackendError> {
        self.opened.lock().unwrap().push(locator.to_string());

        if let Some(message) = &self.open_error {
            return Err(BackendError::Open(message.clone()));
        }

        Ok(TestDocument {
            page_sizes: self.page_sizes.clone(),
            failing_pages: self.failing_pages.clone(),
            close_error: self.close_error,
            page_fetches: Arc::clone(&self.page_fetches),
            cancel_next_render: Arc::clone(&self.cancel_next_render),
        })
    }
}

/// Document handle served by [`TestBackend`]
pub struct TestDocument {
    page_sizes: Vec<PageViewport>,
    failing_pages: HashSet<u32>,
    close_error: bool,
    page_fetches: Arc<Mutex<Vec<u32>>>,
    cancel_next_render: Arc<AtomicBool>,
}

impl DocumentHandle for TestDocument {
    type Page = TestPage;

    fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    fn page(&self, index: u32) -> Result<TestPage, BackendError> {
        self.page_fetches.lock().unwrap().push(index);

        if self.failing_pages.contains(&index) {
            return Err(BackendError::Page {
                index,
                reason: "synthetic page failure".to_string(),
            });
        }

        let size = self
            .page_sizes
            .get(index.saturating_sub(1) as usize)
            .copied()
            .ok_or(BackendError::Page {
                index,
                reason: "no such page".to_string(),
            })?;

        Ok(TestPage {
            index,
            size,
            cancel_next_render: Arc::clone(&self.cancel_next_render),
        })
    }

    fn close(&mut self) -> Result<(), BackendError> {
        if self.close_error {
            Err(BackendError::Release(
                "synthetic close failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Page handle served by [`TestDocument`]
pub struct TestPage {
    index: u32,
    size: PageViewport,
    cancel_next_render: Arc<AtomicBool>,
}

impl TestPage {
    /// The 1-based index this page was fetched as
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl PageHandle for TestPage {
    fn viewport(&self, scale: f32) -> PageViewport {
        PageViewport::new(self.size.width * scale, self.size.height * scale)
    }

    fn render(
        &self,
        target: &mut RasterTarget<'_>,
        _viewport: &PageViewport,
        token: &CancellationToken,
    ) -> Result<(), RenderError> {
        if self.cancel_next_render.swap(false, Ordering::SeqCst) {
            token.cancel();
        }

        if token.is_cancelled() {
            return Err(RenderError::Cancelled);
        }

        target.fill(page_shade(self.index));
        Ok(())
    }
}
