//! Key commands over the navigation state
//!
//! The chrome maps physical keys to these commands and applies the returned
//! response. Documents compose right to left, so a host typically binds the
//! right arrow to [`NavKey::PageBack`] and the left arrow to
//! [`NavKey::PageForward`].

use crate::nav::{ViewerMode, ViewerState};

/// Zoom change applied per zoom key press
pub const KEY_ZOOM_STEP: f32 = 0.1;

/// Logical pixels scrolled per scroll key press
pub const KEY_SCROLL_STEP: f32 = 120.0;

/// A key command aimed at the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    /// Zoom in one step
    ZoomIn,

    /// Zoom out one step
    ZoomOut,

    /// Advance in reading order
    PageForward,

    /// Go back in reading order
    PageBack,

    /// Scroll the active container down
    ScrollDown,

    /// Scroll the active container up
    ScrollUp,
}

/// What the host should do after a key command was handled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyResponse {
    /// The state machine absorbed the command
    Handled,

    /// Scroll the active scroll container by this many logical pixels
    ScrollActive(f32),
}

/// Apply a key command to the navigation state
///
/// Page keys step by two pages in horizontal spread mode, where a slide
/// holds a full spread, and by one page everywhere else.
pub fn handle_key(nav: &mut ViewerState, key: NavKey) -> KeyResponse {
    match key {
        NavKey::ZoomIn => {
            nav.change_zoom_by(KEY_ZOOM_STEP);
            KeyResponse::Handled
        }
        NavKey::ZoomOut => {
            nav.change_zoom_by(-KEY_ZOOM_STEP);
            KeyResponse::Handled
        }
        NavKey::PageForward => {
            let step = page_step(nav);
            nav.go_to_page(nav.current_page().saturating_add(step));
            KeyResponse::Handled
        }
        NavKey::PageBack => {
            let step = page_step(nav);
            nav.go_to_page(nav.current_page().saturating_sub(step).max(1));
            KeyResponse::Handled
        }
        NavKey::ScrollDown => KeyResponse::ScrollActive(KEY_SCROLL_STEP),
        NavKey::ScrollUp => KeyResponse::ScrollActive(-KEY_SCROLL_STEP),
    }
}

fn page_step(nav: &ViewerState) -> u32 {
    if nav.mode() == ViewerMode::Horizontal && nav.is_spread_mode() {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav(pages: u32) -> ViewerState {
        let mut nav = ViewerState::new();
        nav.set_num_pages(pages);
        nav
    }

    #[test]
    fn zoom_keys_step_by_a_tenth() {
        let mut nav = nav(10);

        handle_key(&mut nav, NavKey::ZoomIn);
        assert_eq!(nav.zoom_scale(), 1.1);

        handle_key(&mut nav, NavKey::ZoomOut);
        handle_key(&mut nav, NavKey::ZoomOut);
        assert_eq!(nav.zoom_scale(), 0.9);
    }

    #[test]
    fn page_keys_step_one_page_by_default() {
        let mut nav = nav(10);
        nav.set_current_page(5);

        handle_key(&mut nav, NavKey::PageForward);
        assert_eq!(nav.current_page(), 6);

        handle_key(&mut nav, NavKey::PageBack);
        assert_eq!(nav.current_page(), 5);
    }

    #[test]
    fn horizontal_spread_steps_a_whole_slide() {
        let mut nav = nav(10);
        nav.set_mode(ViewerMode::Horizontal);
        nav.set_spread_mode(true);
        nav.set_current_page(5);

        handle_key(&mut nav, NavKey::PageForward);
        assert_eq!(nav.current_page(), 7);

        handle_key(&mut nav, NavKey::PageBack);
        handle_key(&mut nav, NavKey::PageBack);
        assert_eq!(nav.current_page(), 3);
    }

    #[test]
    fn vertical_spread_still_steps_one_page() {
        let mut nav = nav(10);
        nav.set_spread_mode(true);
        nav.set_current_page(5);

        handle_key(&mut nav, NavKey::PageForward);
        assert_eq!(nav.current_page(), 6);
    }

    #[test]
    fn page_keys_saturate_at_the_ends() {
        let mut nav = nav(10);

        handle_key(&mut nav, NavKey::PageBack);
        assert_eq!(nav.current_page(), 1);

        nav.set_current_page(10);
        handle_key(&mut nav, NavKey::PageForward);
        assert_eq!(nav.current_page(), 10);
    }

    #[test]
    fn scroll_keys_defer_to_the_host() {
        let mut nav = nav(10);

        assert_eq!(
            handle_key(&mut nav, NavKey::ScrollDown),
            KeyResponse::ScrollActive(KEY_SCROLL_STEP)
        );
        assert_eq!(
            handle_key(&mut nav, NavKey::ScrollUp),
            KeyResponse::ScrollActive(-KEY_SCROLL_STEP)
        );
    }
}
