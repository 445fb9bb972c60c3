pub mod report_handler;

pub use report_handler::{get_report, list_reports, resolve_report, stream_reports, ReportState};
