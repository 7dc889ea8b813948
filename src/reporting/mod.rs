pub mod html;
pub mod log_parser;
pub mod summary;

pub use html::{render_html, write_html_report};
pub use log_parser::{LogSummary, LoggedFinding};
pub use summary::{write_json_summary, write_vulnerabilities};
