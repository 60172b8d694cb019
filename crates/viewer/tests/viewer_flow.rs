//! End-to-end flows across session, renderer, and both virtualizers

use std::sync::{Arc, Mutex};

use folio_render::testing::{page_shade, TestBackend};
use folio_render::{PageRenderer, RenderOutcome, RenderRequest, Surface};
use folio_session::{DocumentSession, SessionState};
use folio_viewer::{
    GroupLayout, HorizontalViewer, PagePlan, VerticalViewer, ViewerMode, ViewerState,
};

fn ready_session(pages: u32) -> (TestBackend, DocumentSession<TestBackend>, ViewerState) {
    let backend = TestBackend::with_pages(pages);
    let session = DocumentSession::open(backend.clone(), "memory:doc");

    let mut nav = ViewerState::new();
    nav.set_num_pages(session.page_count());

    (backend, session, nav)
}

#[test]
fn vertical_jump_aligns_the_requested_page() {
    let (_backend, mut session, mut nav) = ready_session(10);

    let viewer = Arc::new(Mutex::new(VerticalViewer::new()));
    {
        let mut v = viewer.lock().unwrap();
        v.set_container_size(808.0, 712.0);
        v.sync(nav.snapshot());
        v.ensure_sizes(&mut session);
    }
    VerticalViewer::install(&viewer, &mut nav);

    nav.go_to_page(7);
    assert_eq!(nav.current_page(), 7);

    let v = viewer.lock().unwrap();
    assert_eq!(v.scroll_top(), v.row_offset(6));
    assert!(v.scroll_top() > 0.0);
}

#[test]
fn enabling_spread_regroups_rows_in_pairs() {
    let (_backend, _session, mut nav) = ready_session(10);
    nav.go_to_page(7);
    nav.set_spread_mode(true);

    let layout = GroupLayout::new(nav.num_pages(), nav.is_spread_mode());
    let row = layout.group_of(nav.current_page());
    assert_eq!(layout.pages(row).as_slice(), &[7, 8]);

    let rows: Vec<Vec<u32>> = (0..layout.group_count())
        .map(|group| layout.pages(group).to_vec())
        .collect();
    assert_eq!(
        rows,
        vec![vec![1, 2], vec![3, 4], vec![5, 6], vec![7, 8], vec![9, 10]]
    );
}

#[test]
fn failed_open_halts_all_page_activity() {
    let backend = TestBackend::failing_open("transport error");
    let mut session = DocumentSession::open(backend.clone(), "memory:doc");

    assert!(matches!(session.state(), SessionState::Error { .. }));
    assert_eq!(session.page_count(), 1);

    let mut nav = ViewerState::new();
    nav.set_num_pages(session.page_count());

    let mut viewer = VerticalViewer::new();
    viewer.set_container_size(808.0, 712.0);
    viewer.sync(nav.snapshot());

    // Size requests fail with NotReady and are contained; the transport is
    // never asked for a page.
    assert_eq!(viewer.ensure_sizes(&mut session), 0);
    assert_eq!(backend.total_fetches(), 0);
}

#[test]
fn plan_drives_the_renderer_for_near_pages_only() {
    let (_backend, mut session, nav) = ready_session(10);

    let mut viewer = VerticalViewer::new();
    viewer.set_container_size(808.0, 712.0);
    viewer.sync(nav.snapshot());
    viewer.ensure_sizes(&mut session);

    let renderer = PageRenderer::new();
    let mut rendered = Vec::new();
    let mut placeholders = Vec::new();

    for row in viewer.plan() {
        for page_plan in &row.pages {
            match *page_plan {
                PagePlan::Canvas { page, width } => {
                    let handle = session.get_page(page).expect("page handle");
                    let request = RenderRequest::new(page, width)
                        .with_document_generation(session.generation());
                    let mut surface = Surface::new();
                    let outcome = renderer
                        .render(handle.as_ref(), &request, &mut surface)
                        .expect("render");

                    assert_eq!(outcome, RenderOutcome::Rendered);
                    assert_eq!(&surface.pixels()[..4], &page_shade(page));
                    rendered.push(page);
                }
                PagePlan::Placeholder { page, width, height } => {
                    assert_eq!(width, width.floor());
                    assert_eq!(height, height.floor());
                    placeholders.push(page);
                }
            }
        }
    }

    // Current page 1: pages 1..=3 are near, the rest of the window is boxed.
    assert_eq!(rendered, vec![1, 2, 3]);
    assert!(!placeholders.is_empty());
    assert!(placeholders.iter().all(|page| *page > 3));
}

#[test]
fn mode_switch_resyncs_the_newly_mounted_strategy() {
    let (_backend, mut session, mut nav) = ready_session(10);

    let vertical = Arc::new(Mutex::new(VerticalViewer::new()));
    {
        let mut v = vertical.lock().unwrap();
        v.set_container_size(808.0, 712.0);
        v.sync(nav.snapshot());
        v.ensure_sizes(&mut session);
    }
    VerticalViewer::install(&vertical, &mut nav);

    nav.go_to_page(7);
    assert_eq!(nav.current_page(), 7);

    // Switch strategies: the vertical viewer unmounts, the horizontal one
    // mounts and registers. Registration alone restores the physical
    // position; nobody re-issues go_to_page.
    nav.set_mode(ViewerMode::Horizontal);
    nav.set_go_to_page_impl(None);

    let horizontal = Arc::new(Mutex::new(HorizontalViewer::new()));
    {
        let mut h = horizontal.lock().unwrap();
        h.set_container_size(808.0, 712.0);
        h.sync(nav.snapshot());
    }
    HorizontalViewer::install(&horizontal, &mut nav);

    assert_eq!(horizontal.lock().unwrap().selected_slide(), 6);
    assert_eq!(nav.current_page(), 7);
}

#[test]
fn spread_settle_keeps_the_current_page_stable() {
    let (_backend, _session, mut nav) = ready_session(10);
    nav.set_spread_mode(true);
    nav.set_current_page(4);

    let mut viewer = HorizontalViewer::new();
    viewer.set_container_size(808.0, 712.0);
    viewer.sync(nav.snapshot());

    // Settling on the slide already showing page 4 must not flip to 5.
    let derived = viewer.select_slide(1);
    nav.set_current_page(derived);
    assert_eq!(nav.current_page(), 4);

    // Settling one slide further moves to that slide's first page.
    let derived = viewer.select_slide(2);
    nav.set_current_page(derived);
    assert_eq!(nav.current_page(), 5);
}

#[test]
fn reopen_invalidates_previous_generation_renders() {
    let (_backend, mut session, _nav) = ready_session(10);
    let renderer = PageRenderer::new();

    let page = session.get_page(1).expect("page");
    let request =
        RenderRequest::new(1, 400.0).with_document_generation(session.generation());
    let mut surface = Surface::new();
    renderer
        .render(page.as_ref(), &request, &mut surface)
        .expect("render");

    session.reopen("memory:other");

    // The same geometry under the new generation is a different request, so
    // the renderer does not treat it as unchanged.
    let page = session.get_page(1).expect("page");
    let request =
        RenderRequest::new(1, 400.0).with_document_generation(session.generation());
    let outcome = renderer
        .render(page.as_ref(), &request, &mut surface)
        .expect("render");
    assert_eq!(outcome, RenderOutcome::Rendered);
}
