//! Folio Viewer Library
//!
//! Viewport virtualization and navigation for the paginated-document viewer:
//! the navigation/zoom state machine, the layout math shared by both
//! virtualization strategies, the continuous-scroll and paginated-slide
//! strategies themselves, and the key command mapping.

pub mod horizontal;
pub mod input;
pub mod layout;
pub mod nav;
pub mod vertical;

pub use horizontal::{HorizontalViewer, SlidePlan, SlideTransition};
pub use input::{handle_key, KeyResponse, NavKey, KEY_SCROLL_STEP, KEY_ZOOM_STEP};
pub use layout::{
    fitted_page_width, is_near, near_window, plan_pages, ContainerSize, FitSpec, GroupLayout,
    PagePlan, HORIZONTAL_FIT, PAGE_MAX_WIDTH, SPREAD_GAP, VERTICAL_FIT,
};
pub use nav::{
    GoToPageFn, NavSnapshot, ViewerMode, ViewerState, MAX_ZOOM_SCALE, MIN_ZOOM_SCALE,
};
pub use vertical::{RowPlan, VerticalConfig, VerticalViewer, SCROLL_EDGE_EPSILON};
