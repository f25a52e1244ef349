use crate::domain::TimestampUnit;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const LAST_USED_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Width of every string produced by [`Clock::format`].
pub const LAST_USED_WIDTH: usize = 19;

/// Turns stored history timestamps into `YYYY-MM-DD hh:mm:ss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub unit: TimestampUnit,
    pub offset: UtcOffset,
}

impl Clock {
    pub fn new(unit: TimestampUnit, offset: UtcOffset) -> Self {
        Self { unit, offset }
    }

    /// Resolve the process-local offset once. Falls back to UTC when the
    /// platform cannot tell (e.g. the process already has several threads).
    pub fn local(unit: TimestampUnit) -> Self {
        let local = UtcOffset::current_local_offset()
            .inspect_err(|e| tracing::warn!("local UTC offset unavailable ({e}); using UTC"))
            .ok();
        Self::local_or_utc(unit, local)
    }

    fn local_or_utc(unit: TimestampUnit, local: Option<UtcOffset>) -> Self {
        Self {
            unit,
            offset: local.unwrap_or(UtcOffset::UTC),
        }
    }

    /// Returns `None` when the value is outside the representable date range.
    pub fn format(&self, timestamp: i64) -> Option<String> {
        // Shift into wall-clock time up front so the conversion itself can fail
        // instead of panicking on the offset adjustment.
        let nanos = i128::from(timestamp) * self.unit.nanos_per_unit()
            + i128::from(self.offset.whole_seconds()) * 1_000_000_000;
        let wall = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
        wall.format(LAST_USED_FORMAT).ok()
    }
}
