use crate::util::{FsContext, ThirtyError, ThirtyErrorKind};
use crate::{loud, normal};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::fs::{create_dir_all, read_to_string, write};
use std::path::{Path, PathBuf};

pub const TOTAL_DAYS: u32 = 30;

/// Day of the challenge for a run at `now`, counting the start day as 1.
pub fn progress_day(start: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let elapsed = now.signed_duration_since(start).num_days();
    elapsed.saturating_add(1).clamp(1, TOTAL_DAYS as i64) as u32
}

/// Parse the ISO-8601 forms a start date is commonly written in.
/// Timestamps without an offset are local time; bare dates are UTC
/// midnight.
pub fn parse_start_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// The single file holding the instant the challenge started.  Written
/// once, on the first run, and only read afterwards.
pub struct StartDateFile {
    path: PathBuf,
}

impl StartDateFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        StartDateFile {
            path: path.as_ref().to_owned(),
        }
    }

    pub fn get_or_init(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ThirtyError> {
        if !self.path.exists() {
            if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
                create_dir_all(dir).fs_context(|| format!("unable to create state directory: {}", dir.display()))?;
            }
            let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
            write(&self.path, &stamp)
                .fs_context(|| format!("unable to write start date: {}", self.path.display()))?;
            normal!("Starting a new challenge today ({})", self.path.display());
            return Ok(now);
        }

        let raw = read_to_string(&self.path)
            .fs_context(|| format!("unable to read start date: {}", self.path.display()))?;
        // A bad value here must never be replaced: that would restart the count.
        parse_start_date(&raw).ok_or_else(|| {
            ThirtyError::kind(
                ThirtyErrorKind::State,
                Some(&format!(
                    "start date in {} is not a recognized date or timestamp: {:?}",
                    self.path.display(),
                    raw.trim()
                )),
            )
        })
    }
}

pub struct ProgressTracker {
    store: StartDateFile,
}

impl ProgressTracker {
    pub fn new(store: StartDateFile) -> Self {
        ProgressTracker { store }
    }

    pub fn progress_day(&self, now: DateTime<Utc>) -> Result<u32, ThirtyError> {
        let start = self.store.get_or_init(now)?;
        let day = progress_day(start, now);
        loud!(" - challenge started {}, day {}/{}", start.to_rfc3339(), day, TOTAL_DAYS);
        Ok(day)
    }
}
