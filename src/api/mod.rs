//! All trip planner backend calls

pub mod client;
pub mod sse;
pub mod stream;

// Re-export main types for convenience
pub use client::{PlannerClient, previews_url};
pub use stream::read_plan_stream;
