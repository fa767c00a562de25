//! Read-only views over the task store: dashboards and spreadsheet exports.

pub mod dashboard;
pub mod export;
pub mod spreadsheet;

pub use dashboard::{dashboard_summary, summarize, DashboardData, DashboardScope};
pub use export::{export_tasks, export_users};
pub use spreadsheet::{Table, XLSX_CONTENT_TYPE};
