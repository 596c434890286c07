use super::*;

fn viewport() -> Viewport {
    Viewport { width: 1000.0, scroll_y: 0.0 }
}

fn keyed() -> Settings {
    Settings { api_key: "sk".into(), ..Settings::default() }
}

#[test]
fn centered_below_selection() {
    let rect = Rect { left: 200.0, top: 50.0, width: 300.0, height: 20.0 };
    let p = place_affordance(rect, viewport());
    assert_eq!(p.left, 300.0);
    assert_eq!(p.top, 80.0);
    assert_eq!((p.width, p.height), (100.0, 36.0));
}

#[test]
fn scroll_offset_moves_top_only() {
    let rect = Rect { left: 200.0, top: 50.0, width: 300.0, height: 20.0 };
    let p = place_affordance(rect, Viewport { width: 1000.0, scroll_y: 500.0 });
    assert_eq!(p.left, 300.0);
    assert_eq!(p.top, 580.0);
}

#[test]
fn clamped_to_left_edge() {
    let rect = Rect { left: 0.0, top: 0.0, width: 20.0, height: 10.0 };
    assert_eq!(place_affordance(rect, viewport()).left, 10.0);
}

#[test]
fn clamped_to_right_edge() {
    let rect = Rect { left: 980.0, top: 0.0, width: 20.0, height: 10.0 };
    assert_eq!(place_affordance(rect, viewport()).left, 890.0);
}

#[test]
fn narrow_viewport_prefers_left_spacing() {
    let rect = Rect { left: 0.0, top: 0.0, width: 50.0, height: 10.0 };
    let p = place_affordance(rect, Viewport { width: 80.0, scroll_y: 0.0 });
    assert_eq!(p.left, 10.0);
}

#[test]
fn blank_selection_hides() {
    let mut c = SelectionController::new();
    let rect = Rect { left: 10.0, top: 10.0, width: 100.0, height: 10.0 };
    assert!(c.on_mouse_up("word", rect, viewport()).is_some());
    assert!(c.is_visible());

    assert!(c.on_mouse_up("   \n", rect, viewport()).is_none());
    assert!(!c.is_visible());
    assert!(c.selection().is_none());
}

#[test]
fn mouse_down_outside_hides_inside_keeps() {
    let mut c = SelectionController::new();
    c.on_mouse_up("word", Rect::default(), viewport());
    c.on_mouse_down(true);
    assert!(c.is_visible());
    c.on_mouse_down(false);
    assert!(!c.is_visible());
}

#[test]
fn trigger_builds_explain_with_trimmed_text() {
    let mut c = SelectionController::new();
    c.on_mouse_up("  Lorem ipsum dolor sit amet \n", Rect::default(), viewport());

    let Some(Trigger::Explain(request)) = c.trigger(&keyed()) else {
        panic!("expected explain request");
    };
    assert_eq!(request, Request::Explain { text: "Lorem ipsum dolor sit amet".into(), settings: keyed() });
    assert!(c.is_loading());
}

#[test]
fn trigger_without_key_notifies() {
    let mut c = SelectionController::new();
    c.on_mouse_up("text", Rect::default(), viewport());
    let trigger = c.trigger(&Settings::default()).unwrap();
    assert_eq!(trigger, Trigger::Notify(Notification::error(MISSING_KEY_MESSAGE)));
    assert!(!c.is_loading());
}

#[test]
fn trigger_without_selection_does_nothing() {
    let mut c = SelectionController::new();
    assert!(c.trigger(&keyed()).is_none());
}

#[test]
fn error_response_becomes_notification() {
    let mut c = SelectionController::new();
    c.on_mouse_up("text", Rect::default(), viewport());
    c.trigger(&keyed());

    let note = c.on_response(&Response::error("Rate limit exceeded")).unwrap();
    assert_eq!(note.message, "Error: Rate limit exceeded");
    assert_eq!(note.kind, NotificationKind::Error);
    assert!(!c.is_loading());

    assert!(c.on_response(&Response::explanation("fine")).is_none());
}
