//! The bidirectional shift timeline.
//!
//! A timeline is a window over one contact's shifts, anchored at the
//! organization-local "today" and extended page by page in either
//! direction. [`window`] holds the pure merge and grouping logic;
//! [`paginator`] drives it against a repository.

pub mod paginator;
pub mod window;

pub use paginator::{ShiftTimeline, TimelineError, organization_today};
pub use window::{DayGroup, ShiftTimelineWindow};
