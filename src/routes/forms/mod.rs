mod handler;
mod model;

pub use handler::submit_form;
pub use model::FormSubmission;
