use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, SecondsFormat, TimeZone, Utc};

use crate::error::{StoreError, StoreResult};

/// Fixed timezone used for timestamps shown to users and for "today" queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingZone {
    offset: FixedOffset,
}

impl Default for ReportingZone {
    /// UTC+3, Moscow time
    fn default() -> Self {
        Self::from_hours(3).unwrap_or_else(Self::utc)
    }
}

impl ReportingZone {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// `None` when the offset is outside ±23 hours
    pub fn from_hours(hours: i32) -> Option<Self> {
        hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Half-open `[start, end)` bounds of a calendar day in this zone
    pub fn day_bounds(&self, day: NaiveDate) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        let midnight = day.and_time(NaiveTime::MIN);
        // Fixed offsets have exactly one mapping for every local time.
        let start = self
            .offset
            .from_local_datetime(&midnight)
            .single()
            .unwrap_or_else(|| self.offset.from_utc_datetime(&midnight));
        (start, start + Duration::days(1))
    }
}

/// Storage encoding: UTC with fixed microsecond precision so that string order
/// matches time order.
pub fn to_storage(at: &DateTime<FixedOffset>) -> String {
    at.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn from_storage(raw: &str, zone: &ReportingZone) -> StoreResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&zone.offset()))
        .map_err(|err| StoreError::Timestamp(format!("{}: {}", raw, err)))
}
