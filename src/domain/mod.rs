pub mod link;
pub mod report;

pub use link::Link;
pub use report::CycleReport;
