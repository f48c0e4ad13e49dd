//! Report generation port trait.

use crate::domain::engine::CycleReport;
use crate::domain::error::RebalancerError;

/// Port for writing the cycle reports of a run.
pub trait ReportPort {
    fn write(&self, reports: &[CycleReport], output_path: &str) -> Result<(), RebalancerError>;
}
