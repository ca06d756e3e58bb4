//! Text helpers for printing feed content to a terminal.
//!
//! Feed text comes from arbitrary publishers, so everything printed by the
//! command-line tool goes through [`strip_control_chars`] first.
//!
//! # Examples
//!
//! ```
//! use atomfeed::util::{display_width, strip_control_chars, truncate_to_width};
//!
//! let title = strip_control_chars("\x1b[1mBreaking\x1b[0m news");
//! assert_eq!(title, "Breaking news");
//! assert_eq!(display_width(&title), 13);
//! assert_eq!(truncate_to_width(&title, 11), "Breaking...");
//! ```

mod text;

pub use text::{display_width, single_line, strip_control_chars, truncate_to_width};
