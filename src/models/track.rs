use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Opaque catalog identifier of a track.
pub type TrackId = String;

const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Top search hit, reduced to what the playlist job looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub id: TrackId,
    pub release_date: String,
}

impl CatalogTrack {
    /// Only full `YYYY-MM-DD` dates count; albums released with year or
    /// month precision never parse.
    pub fn parsed_release_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.release_date, RELEASE_DATE_FORMAT).ok()
    }

    /// True when the release (taken as midnight of its day) is not older
    /// than `now - window_days`.
    pub fn released_within(&self, now: NaiveDateTime, window_days: i64) -> bool {
        match self.parsed_release_date() {
            Some(released) => released.and_time(NaiveTime::MIN) >= now - Duration::days(window_days),
            None => false,
        }
    }
}
