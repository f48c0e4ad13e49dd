//! CSV order-log adapter implementing ReportPort.
//!
//! One row per order intent produced by a cycle, submitted or rejected.

use std::fs;
use std::path::Path;

use crate::domain::engine::CycleReport;
use crate::domain::error::RebalancerError;
use crate::ports::report_port::ReportPort;

const HEADER: [&str; 10] = [
    "cycle",
    "date",
    "instrument",
    "side",
    "quantity",
    "price",
    "notional",
    "status",
    "reason",
    "tranche",
];

pub struct CsvOrderLogAdapter;

impl CsvOrderLogAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvOrderLogAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn csv_error(e: csv::Error) -> RebalancerError {
    RebalancerError::Io(std::io::Error::other(e.to_string()))
}

impl ReportPort for CsvOrderLogAdapter {
    fn write(&self, reports: &[CycleReport], output_path: &str) -> Result<(), RebalancerError> {
        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
        writer.write_record(HEADER).map_err(csv_error)?;

        for report in reports {
            let cycle = report.cycle.to_string();
            let date = report.date.to_string();
            let tranche = report
                .opened_tranche
                .map(|id| id.to_string())
                .unwrap_or_default();

            let submitted = report.orders.iter().map(|o| (o, "submitted", ""));
            let rejected = report
                .rejected
                .iter()
                .map(|r| (&r.order, "rejected", r.reason.as_str()));

            for (order, status, reason) in submitted.chain(rejected) {
                let side = order.side.to_string();
                let quantity = format!("{:.6}", order.quantity);
                let price = format!("{:.6}", order.price);
                let notional = format!("{:.2}", order.notional);
                writer
                    .write_record([
                        cycle.as_str(),
                        date.as_str(),
                        order.instrument.as_str(),
                        side.as_str(),
                        quantity.as_str(),
                        price.as_str(),
                        notional.as_str(),
                        status,
                        reason,
                        tranche.as_str(),
                    ])
                    .map_err(csv_error)?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}
