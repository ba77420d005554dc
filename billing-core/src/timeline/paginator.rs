//! Drives a [`ShiftTimelineWindow`] against a repository.
//!
//! The paginator owns the anchoring rule: with no cursor loaded yet,
//! fetching starts at the beginning of "today" in the organization's
//! timezone, so the first page a caller sees always opens at now.
//! Each load call covers exactly one direction. Loads take `&mut self`,
//! so two loads can never race on the same window; a page that arrives
//! from a retried or superseded fetch merges idempotently instead of
//! being discarded.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::debug;

use crate::db::repository::{BillingRepository, RepositoryError};
use crate::models::PageDirection;
use crate::timeline::window::{DayGroup, ShiftTimelineWindow};

/// Errors that can occur while loading the timeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimelineError {
    /// The organization's zone name is not a known IANA zone.
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Resolves "today" for an organization: `now` projected into the
/// named IANA zone, truncated to the calendar date.
pub fn organization_today(
    zone_name: &str,
    now: DateTime<Utc>,
) -> Result<NaiveDate, TimelineError> {
    let timezone: Tz = zone_name
        .parse()
        .map_err(|_| TimelineError::UnknownTimezone(zone_name.to_string()))?;
    Ok(now.with_timezone(&timezone).date_naive())
}

/// Local midnight of `date` expressed in UTC. A zone that skips
/// midnight on a DST day falls back to reading the wall-clock time as
/// UTC, which stays inside the same local date.
fn start_of_day_utc(
    timezone: Tz,
    date: NaiveDate,
) -> DateTime<Utc> {
    use chrono::TimeZone;

    let midnight = date.and_time(NaiveTime::MIN);
    timezone
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| timezone.from_utc_datetime(&midnight))
        .with_timezone(&Utc)
}

/// A contact's shift timeline, loaded page by page in both directions.
pub struct ShiftTimeline<'a> {
    repository: &'a dyn BillingRepository,
    contact_id: i64,
    timezone: Tz,
    page_size: u32,
    /// Start of the organization-local "today" at open time; the
    /// cursor used until a fetch establishes real window ends.
    anchor: DateTime<Utc>,
    window: ShiftTimelineWindow,
}

impl<'a> ShiftTimeline<'a> {
    /// Opens a timeline for `contact_id` and loads the first page,
    /// anchored at the start of the organization-local "today".
    ///
    /// # Errors
    ///
    /// Fails when the organization's timezone cannot be resolved or
    /// the initial fetch fails.
    pub async fn open(
        repository: &'a dyn BillingRepository,
        contact_id: i64,
        page_size: u32,
        now: DateTime<Utc>,
    ) -> Result<ShiftTimeline<'a>, TimelineError> {
        let zone_name = repository.organization_timezone().await?;
        let timezone: Tz = zone_name
            .parse()
            .map_err(|_| TimelineError::UnknownTimezone(zone_name.clone()))?;
        let today = now.with_timezone(&timezone).date_naive();
        let anchor = start_of_day_utc(timezone, today);

        let mut timeline = Self {
            repository,
            contact_id,
            timezone,
            page_size,
            anchor,
            window: ShiftTimelineWindow::new(),
        };
        timeline.load_more_after().await?;
        Ok(timeline)
    }

    /// Fetches and merges one page strictly earlier than the window.
    pub async fn load_more_before(&mut self) -> Result<(), TimelineError> {
        let cursor = self.window.cursor_before().unwrap_or(self.anchor);
        let page = self
            .repository
            .fetch_shifts_page(self.contact_id, PageDirection::Before, cursor, self.page_size)
            .await?;
        debug!(
            contact_id = self.contact_id,
            fetched = page.items.len(),
            has_more = page.has_more,
            "merging earlier shifts"
        );
        self.window.merge_before(page);
        Ok(())
    }

    /// Fetches and merges one page at the window's end or later.
    pub async fn load_more_after(&mut self) -> Result<(), TimelineError> {
        let cursor = self.window.cursor_after().unwrap_or(self.anchor);
        let page = self
            .repository
            .fetch_shifts_page(self.contact_id, PageDirection::After, cursor, self.page_size)
            .await?;
        debug!(
            contact_id = self.contact_id,
            fetched = page.items.len(),
            has_more = page.has_more,
            "merging later shifts"
        );
        self.window.merge_after(page);
        Ok(())
    }

    pub fn window(&self) -> &ShiftTimelineWindow {
        &self.window
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The loaded window bucketed into organization-local days, with
    /// the bucket for "today" (as of `now`) always present.
    pub fn day_groups(
        &self,
        now: DateTime<Utc>,
    ) -> Vec<DayGroup> {
        let today = now.with_timezone(&self.timezone).date_naive();
        self.window.day_groups(self.timezone, today)
    }
}
