//! Replay performance summary.

use super::portfolio::EquityPoint;
use super::replay::ReplayResult;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayMetrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub cycles: usize,
    pub cycles_with_orders: usize,
    pub orders: usize,
    pub rejected_orders: usize,
    pub suppressed_orders: usize,
    pub traded_notional: f64,
    pub total_commission: f64,
    pub realized_pnl: f64,
}

impl ReplayMetrics {
    pub fn compute(result: &ReplayResult) -> Self {
        let initial_capital = result.initial_capital;
        let total_return = if initial_capital > 0.0 {
            (result.final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&result.equity_curve);

        let reports = &result.reports;
        ReplayMetrics {
            total_return,
            max_drawdown,
            max_drawdown_duration,
            cycles: reports.len(),
            cycles_with_orders: reports.iter().filter(|r| !r.orders.is_empty()).count(),
            orders: reports.iter().map(|r| r.orders.len()).sum(),
            rejected_orders: reports.iter().map(|r| r.rejected.len()).sum(),
            suppressed_orders: reports.iter().map(|r| r.suppressed).sum(),
            traded_notional: reports.iter().map(|r| r.traded_notional()).sum(),
            total_commission: result.fills.iter().map(|f| f.commission).sum(),
            realized_pnl: result.fills.iter().map(|f| f.realized_pnl).sum(),
        }
    }
}

/// Largest peak-to-trough fraction and the longest run of points below a peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, i64) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::CycleReport;
    use crate::domain::execution::{OrderIntent, Side};
    use crate::domain::portfolio::Fill;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                equity: v,
            })
            .collect()
    }

    fn report(cycle: u64, notionals: &[f64], suppressed: usize) -> CycleReport {
        CycleReport {
            cycle,
            date: NaiveDate::from_ymd_opt(2024, cycle as u32, 1).unwrap(),
            ranked: 4,
            long: vec![],
            short: vec![],
            weights: Default::default(),
            opened_tranche: None,
            closed_tranches: vec![],
            orders: notionals
                .iter()
                .map(|&n| OrderIntent {
                    instrument: "A".into(),
                    side: Side::Buy,
                    quantity: n / 10.0,
                    price: 10.0,
                    notional: n,
                })
                .collect(),
            suppressed,
            rejected: vec![],
            sizing_skipped: false,
        }
    }

    fn result(values: &[f64], reports: Vec<CycleReport>, fills: Vec<Fill>) -> ReplayResult {
        ReplayResult {
            reports,
            equity_curve: curve(values),
            fills,
            initial_capital: values.first().copied().unwrap_or(100_000.0),
            final_equity: values.last().copied().unwrap_or(100_000.0),
            timestamps: values.len(),
        }
    }

    #[test]
    fn empty_replay() {
        let m = ReplayMetrics::compute(&result(&[], vec![], vec![]));
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.cycles, 0);
        assert_eq!(m.orders, 0);
    }

    #[test]
    fn total_return_sign() {
        let up = ReplayMetrics::compute(&result(&[100_000.0, 110_000.0], vec![], vec![]));
        assert_relative_eq!(up.total_return, 0.10, epsilon = 1e-12);
        let down = ReplayMetrics::compute(&result(&[100_000.0, 90_000.0], vec![], vec![]));
        assert_relative_eq!(down.total_return, -0.10, epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_and_duration() {
        let (dd, duration) = compute_drawdown(&curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]));
        assert_relative_eq!(dd, 30.0 / 110.0);
        assert_eq!(duration, 4);
    }

    #[test]
    fn order_counters_sum_over_cycles() {
        let reports = vec![report(1, &[1_000.0, 500.0], 1), report(2, &[], 2), report(3, &[250.0], 0)];
        let fills = vec![Fill {
            date: None,
            instrument: "A".into(),
            side: Side::Buy,
            quantity: 1.0,
            price: 10.0,
            commission: 2.5,
            realized_pnl: -2.5,
        }];
        let m = ReplayMetrics::compute(&result(&[100.0, 100.0], reports, fills));
        assert_eq!(m.cycles, 3);
        assert_eq!(m.cycles_with_orders, 2);
        assert_eq!(m.orders, 3);
        assert_eq!(m.suppressed_orders, 3);
        assert_eq!(m.rejected_orders, 0);
        assert_relative_eq!(m.traded_notional, 1_750.0);
        assert_relative_eq!(m.total_commission, 2.5);
        assert_relative_eq!(m.realized_pnl, -2.5);
    }
}
