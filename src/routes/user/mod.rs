mod handler;
mod model;

pub use handler::{get_profile, get_my_activities, list_users, login, register};
pub use model::User;
