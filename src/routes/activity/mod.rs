mod handler;
mod model;

pub use handler::find_recent_activities;
pub use model::{ActivityEntry, ActivityLog, activity_types};
