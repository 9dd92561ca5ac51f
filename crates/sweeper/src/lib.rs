pub mod report;
pub mod sweeper;

pub use report::SweepReport;
pub use sweeper::ExpirySweeper;
