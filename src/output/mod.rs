mod json;
mod summary;

pub use json::{to_json, write_report};
pub use summary::{clean_message, format_summary, print_summary};
