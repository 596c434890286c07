//! Selection controller — where the "Explain" affordance goes and what
//! pressing it sends.
//!
//! The host feeds mouse events with the current selection's text and
//! bounding box; the controller decides visibility and placement, and turns
//! a press into an `explain` request or a user-facing notification.

use std::time::Duration;

use crate::envelope::Response;
use crate::router::Request;
use crate::settings::Settings;

pub const AFFORDANCE_WIDTH: f64 = 100.0;
pub const AFFORDANCE_HEIGHT: f64 = 36.0;
pub const AFFORDANCE_SPACING: f64 = 10.0;
pub const NOTIFICATION_DURATION: Duration = Duration::from_millis(3000);
pub const MISSING_KEY_MESSAGE: &str = "Please set your API key in the extension options";

/// Selection bounding box in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub scroll_y: f64,
}

/// Affordance position in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Centered under the selection, kept `AFFORDANCE_SPACING` from either
/// viewport edge. On a viewport narrower than the affordance the left edge
/// wins.
#[must_use]
pub fn place_affordance(rect: Rect, viewport: Viewport) -> Placement {
    let centered = rect.left + (rect.width - AFFORDANCE_WIDTH) / 2.0;
    let right_limit = viewport.width - AFFORDANCE_WIDTH - AFFORDANCE_SPACING;
    let left = AFFORDANCE_SPACING.max(centered.min(right_limit));
    let top = rect.bottom() + AFFORDANCE_SPACING + viewport.scroll_y;
    Placement { left, top, width: AFFORDANCE_WIDTH, height: AFFORDANCE_HEIGHT }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

/// Transient toast shown for `NOTIFICATION_DURATION`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: NotificationKind::Error }
    }
}

/// What a press on the affordance produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Explain(Request),
    Notify(Notification),
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selection: Option<String>,
    placement: Option<Placement>,
    loading: bool,
}

impl SelectionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.placement.is_some()
    }

    #[must_use]
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Show the affordance for a non-blank selection, hide it otherwise.
    pub fn on_mouse_up(&mut self, selected_text: &str, rect: Rect, viewport: Viewport) -> Option<Placement> {
        let text = selected_text.trim();
        if text.is_empty() {
            self.hide();
            return None;
        }
        self.selection = Some(text.to_string());
        self.placement = Some(place_affordance(rect, viewport));
        self.placement
    }

    /// A press anywhere but the affordance hides it.
    pub fn on_mouse_down(&mut self, inside_affordance: bool) {
        if !inside_affordance {
            self.hide();
        }
    }

    fn hide(&mut self) {
        self.placement = None;
        self.selection = None;
    }

    /// Press on the affordance. `None` when nothing is selected.
    pub fn trigger(&mut self, settings: &Settings) -> Option<Trigger> {
        let text = self.selection.clone()?;
        if !settings.has_api_key() {
            return Some(Trigger::Notify(Notification::error(MISSING_KEY_MESSAGE)));
        }
        self.loading = true;
        Some(Trigger::Explain(Request::Explain { text, settings: settings.clone() }))
    }

    /// Reply to a triggered request. Errors become a notification.
    pub fn on_response(&mut self, response: &Response) -> Option<Notification> {
        self.loading = false;
        response
            .error
            .as_ref()
            .map(|message| Notification::error(format!("Error: {message}")))
    }
}

#[cfg(test)]
#[path = "selection_test.rs"]
mod tests;
