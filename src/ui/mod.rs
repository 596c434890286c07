//! UI models — state machines a browser or WASM front end drives.
//!
//! Nothing here touches a DOM. The host forwards input events, sends the
//! returned envelopes to the service, and renders whatever state results.

pub mod popup;
pub mod selection;

pub use popup::{ChatPopup, PopupMessage};
pub use selection::{Notification, NotificationKind, Placement, Rect, SelectionController, Trigger, Viewport};
