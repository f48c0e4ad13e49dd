//! Market-data history port trait.

use crate::domain::bar::PriceBar;
use crate::domain::error::RebalancerError;
use chrono::NaiveDate;

pub trait DataPort {
    fn fetch_bars(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, RebalancerError>;

    fn list_instruments(&self) -> Result<Vec<String>, RebalancerError>;

    fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RebalancerError>;
}
