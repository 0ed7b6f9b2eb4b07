mod handler;
mod model;

pub use handler::{get_quote_stats, list_quotes, submit_quote, update_quote_status};
pub use model::{Quote, QuoteStats, quote_status};
