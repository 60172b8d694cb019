//! Document session lifecycle and caches
//!
//! A session owns one open document at a time: it loads the document behind
//! a locator, reports the page count, and serves page handles and natural
//! sizes out of fetch-once caches. Disposing or reopening bumps a generation
//! counter that callers use to discard results fetched under a previous
//! document.

use std::collections::HashMap;
use std::sync::Arc;

use folio_render::{BackendError, DocumentBackend, DocumentHandle, PageHandle, PageViewport};

/// Lifecycle state of a document session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The document is being opened
    Loading,

    /// The document opened and pages can be served
    Ready { page_count: u32 },

    /// The open failed; no page activity happens until a reopen
    Error { message: String },

    /// The session was disposed and rejects all further requests
    Disposed,
}

/// Errors reported by session page and size requests
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The session is still loading or its open failed
    #[error("document is not ready")]
    NotReady,

    /// The session was disposed
    #[error("document session is disposed")]
    Disposed,

    /// The requested index is outside `[1, page_count]`
    #[error("page {index} out of range 1..={page_count}")]
    OutOfRange { index: u32, page_count: u32 },

    /// The transport failed to fetch the page
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Loading/error summary the chrome consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub page_count: u32,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// One viewer's document session
///
/// Exactly one session is alive per viewer instance; swapping the locator
/// goes through [`reopen`](DocumentSession::reopen) so the previous native
/// resource is released first.
pub struct DocumentSession<B: DocumentBackend> {
    backend: B,
    locator: String,
    generation: u64,
    state: SessionState,
    document: Option<B::Document>,
    pages: HashMap<u32, Arc<<B::Document as DocumentHandle>::Page>>,
    sizes: HashMap<u32, PageViewport>,
}

impl<B: DocumentBackend> DocumentSession<B> {
    /// Open the document behind `locator`
    ///
    /// The returned session is `Ready` on success and `Error` on failure;
    /// opening never panics. On failure the page count is reported as 1 so
    /// dependent layout math has a sane denominator.
    pub fn open(backend: B, locator: impl Into<String>) -> Self {
        let mut session = Self {
            backend,
            locator: String::new(),
            generation: 0,
            state: SessionState::Loading,
            document: None,
            pages: HashMap::new(),
            sizes: HashMap::new(),
        };
        session.load(locator.into());
        session
    }

    fn load(&mut self, locator: String) {
        self.generation += 1;
        self.state = SessionState::Loading;
        self.pages.clear();
        self.sizes.clear();
        self.locator = locator;

        match self.backend.open(&self.locator) {
            Ok(document) => {
                self.state = SessionState::Ready {
                    page_count: document.page_count(),
                };
                self.document = Some(document);
            }
            Err(err) => {
                log::warn!("failed to open document {}: {err}", self.locator);
                self.document = None;
                self.state = SessionState::Error {
                    message: err.to_string(),
                };
            }
        }
    }

    /// Replace the open document with the one behind `locator`
    ///
    /// The previous native resource is released best-effort before the new
    /// open starts; a release failure is logged, never surfaced.
    pub fn reopen(&mut self, locator: impl Into<String>) {
        self.release_document();
        self.load(locator.into());
    }

    fn release_document(&mut self) {
        if let Some(mut document) = self.document.take() {
            if let Err(err) = document.close() {
                log::warn!(
                    "failed to release document resource for {}: {err}",
                    self.locator
                );
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Locator of the document this session was opened for
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Generation counter, bumped by every reopen and dispose
    ///
    /// Callers holding results from an asynchronous fetch gate on this
    /// before applying them: a changed generation means the result belongs
    /// to a document that is no longer current.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Page count of the open document
    ///
    /// Defined as 1 while loading, after a failed open, and after dispose,
    /// so layout math never divides by zero.
    pub fn page_count(&self) -> u32 {
        match self.state {
            SessionState::Ready { page_count } => page_count,
            _ => 1,
        }
    }

    /// Whether the session can serve pages
    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready { .. })
    }

    /// The status triple the chrome displays
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            page_count: self.page_count(),
            is_loading: matches!(self.state, SessionState::Loading),
            error: match &self.state {
                SessionState::Error { message } => Some(message.clone()),
                _ => None,
            },
        }
    }

    /// Fetch the handle for page `index`, 1-based
    ///
    /// The handle is fetched from the transport at most once per index;
    /// repeated calls share the cached handle.
    pub fn get_page(
        &mut self,
        index: u32,
    ) -> Result<Arc<<B::Document as DocumentHandle>::Page>, SessionError> {
        let page_count = match &self.state {
            SessionState::Ready { page_count } => *page_count,
            SessionState::Disposed => return Err(SessionError::Disposed),
            _ => return Err(SessionError::NotReady),
        };

        if index < 1 || index > page_count {
            return Err(SessionError::OutOfRange { index, page_count });
        }

        if let Some(page) = self.pages.get(&index) {
            return Ok(Arc::clone(page));
        }

        let Some(document) = self.document.as_ref() else {
            return Err(SessionError::NotReady);
        };
        let page = Arc::new(document.page(index)?);
        self.pages.insert(index, Arc::clone(&page));
        Ok(page)
    }

    /// Natural size of page `index`: its viewport at scale 1
    ///
    /// Cached independently of the page handle so repeated layout passes are
    /// free after the first resolution.
    pub fn natural_size(&mut self, index: u32) -> Result<PageViewport, SessionError> {
        if let Some(size) = self.sizes.get(&index) {
            return Ok(*size);
        }

        let page = self.get_page(index)?;
        let size = page.viewport(1.0);
        self.sizes.insert(index, size);
        Ok(size)
    }

    /// Release the native resource and reject all further requests
    pub fn dispose(&mut self) {
        if matches!(self.state, SessionState::Disposed) {
            return;
        }

        self.release_document();
        self.pages.clear();
        self.sizes.clear();
        self.generation += 1;
        self.state = SessionState::Disposed;
    }
}

impl<B: DocumentBackend> Drop for DocumentSession<B> {
    fn drop(&mut self) {
        self.release_document();
    }
}
