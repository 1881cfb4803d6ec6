use chrono::{Datelike, NaiveDate};

use crate::models::TimeWindow;

/// Optional `date`/`month` filter parameters of a reading listing.
///
/// `date` narrows to one calendar day and wins over `month`, which narrows
/// to one calendar month. A value that does not parse is ignored, the
/// listing then simply stays unfiltered.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ReadingQuery {
    date: Option<String>,
    month: Option<String>,
}

impl ReadingQuery {
    pub fn window(&self) -> Option<TimeWindow> {
        self.day_window().or_else(|| self.month_window())
    }

    fn day_window(&self) -> Option<TimeWindow> {
        let raw = self.date.as_deref()?;
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
        TimeWindow::day(date)
    }

    fn month_window(&self) -> Option<TimeWindow> {
        let raw = self.month.as_deref()?;
        // accepts both YYYY-MM and a full date, only year/month matter
        let first = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"))
            .ok()?;
        TimeWindow::month(first.year(), first.month())
    }
}
