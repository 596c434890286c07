//! Render — streaming markdown for explanation and follow-up replies.
//!
//! DESIGN
//! ======
//! Fenced code blocks are located before streaming so they appear as one
//! styled unit with a copy button, never character by character. Everything
//! else is revealed a few characters per frame and re-rendered as markdown
//! on each step.

pub mod markdown;
pub mod stream;

pub use markdown::{CodeBlock, PreparedText, prepare, render_markdown_html};
pub use stream::{Frame, Reveal, spawn_stream};
