pub mod feed;
pub mod pipeline;
pub mod report_service;
pub mod resolution;

pub use feed::{DashboardSession, FeedRuntime, SessionRegistry};
pub use report_service::ReportService;
pub use resolution::{ResolutionService, ResolutionUpload};
