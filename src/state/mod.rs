//! State module for tracking crawl and download progress
//!
//! # Components
//!
//! - `TraversalState`: the accumulator and counters of one listing crawl
//! - `AttemptState`: where a single (record, file type) download stands
//! - `AttemptTracker`: drives `AttemptState` through a bounded retry budget

mod attempt_state;
mod traversal_state;

pub use attempt_state::{AttemptState, AttemptTracker};
pub use traversal_state::{ceiling_for, TraversalState, FIRST_TRAVERSED_PAGE};
