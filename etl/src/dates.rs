use chrono::{Duration, Local, NaiveDate};
use common::{Error, Result};

/// Wire format the Evocon report endpoints expect for date parameters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive extraction window sent to every report endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Resolve the extraction window from optional CLI overrides.
    ///
    /// With no overrides the window covers the last `overlap_days` days up to
    /// and including today, so scheduled runs re-fetch recent days and pick up
    /// late corrections to shift data. A partial override keeps the other
    /// bound's default behavior.
    pub fn resolve(start: Option<&str>, end: Option<&str>, overlap_days: u32) -> Result<Self> {
        Self::resolve_from(start, end, overlap_days, Local::now().date_naive())
    }

    fn resolve_from(
        start: Option<&str>,
        end: Option<&str>,
        overlap_days: u32,
        today: NaiveDate,
    ) -> Result<Self> {
        let end = match end {
            Some(raw) => parse_date(raw)?,
            None => today,
        };
        let start = match start {
            Some(raw) => parse_date(raw)?,
            None => end - Duration::days(i64::from(overlap_days)),
        };

        if end < start {
            return Err(Error::InvalidDate(format!(
                "end date {end} precedes start date {start}"
            )));
        }

        Ok(DateRange { start, end })
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| Error::InvalidDate(format!("'{raw}' is not a valid YYYY-MM-DD date: {e}")))
}
