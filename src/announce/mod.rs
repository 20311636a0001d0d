//! Frame-to-announcement decision logic.
//!
//! - `filter`: label allow-list
//! - `aggregate`: per-frame deduplicated phrases
//! - `throttle`: rate limiting between announcements

pub mod aggregate;
pub mod filter;
pub mod throttle;

pub use aggregate::{phrase, Aggregator, PhraseSet};
pub use filter::AnnouncementFilter;
pub use throttle::{
    compose_announcement, AnnouncementThrottle, Clock, ManualClock, SystemClock, ThrottleState,
    ANNOUNCEMENT_PREAMBLE,
};
