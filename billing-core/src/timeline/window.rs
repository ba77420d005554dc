//! The timeline window: ordered shifts plus the cursors that extend it.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::{Shift, ShiftsPage};

/// Shifts bucketed into one organization-local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub shifts: Vec<Shift>,
}

/// A window over one contact's shifts.
///
/// `items` stays sorted ascending by `(start_time, id)` and unique by
/// shift id. Pages are merged with a sorted insert plus dedupe, so a
/// merge is idempotent and the result does not depend on which of two
/// in-flight fetches lands first. The window is never re-sorted
/// wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftTimelineWindow {
    items: Vec<Shift>,
    cursor_before: Option<DateTime<Utc>>,
    cursor_after: Option<DateTime<Utc>>,
    has_more_before: bool,
    has_more_after: bool,
}

impl ShiftTimelineWindow {
    /// An empty window. Both directions report more data until a fetch
    /// says otherwise.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cursor_before: None,
            cursor_after: None,
            has_more_before: true,
            has_more_after: true,
        }
    }

    pub fn items(&self) -> &[Shift] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Earliest loaded start time; the cursor for the next
    /// earlier-than fetch.
    pub fn cursor_before(&self) -> Option<DateTime<Utc>> {
        self.cursor_before
    }

    /// Latest loaded start time; the cursor for the next later-than
    /// fetch.
    pub fn cursor_after(&self) -> Option<DateTime<Utc>> {
        self.cursor_after
    }

    pub fn has_more_before(&self) -> bool {
        self.has_more_before
    }

    pub fn has_more_after(&self) -> bool {
        self.has_more_after
    }

    /// Merges a page fetched in the `before` direction.
    pub fn merge_before(
        &mut self,
        page: ShiftsPage,
    ) {
        self.has_more_before = page.has_more;
        self.merge_items(page.items);
    }

    /// Merges a page fetched in the `after` direction.
    pub fn merge_after(
        &mut self,
        page: ShiftsPage,
    ) {
        self.has_more_after = page.has_more;
        self.merge_items(page.items);
    }

    fn merge_items(
        &mut self,
        incoming: Vec<Shift>,
    ) {
        for shift in incoming {
            if self.items.iter().any(|existing| existing.id == shift.id) {
                continue;
            }
            let key = (shift.start_time, shift.id);
            let position = self
                .items
                .partition_point(|existing| (existing.start_time, existing.id) < key);
            self.items.insert(position, shift);
        }

        self.cursor_before = self.items.first().map(|shift| shift.start_time);
        self.cursor_after = self.items.last().map(|shift| shift.start_time);
    }

    /// Buckets the window into organization-local calendar days.
    ///
    /// The group for `today` is always present, empty or not, so the
    /// anchor the timeline scrolls to never disappears.
    pub fn day_groups(
        &self,
        timezone: Tz,
        today: NaiveDate,
    ) -> Vec<DayGroup> {
        let mut groups: Vec<DayGroup> = Vec::new();
        for shift in &self.items {
            let local_date = shift.start_time.with_timezone(&timezone).date_naive();
            match groups.last_mut() {
                Some(group) if group.date == local_date => group.shifts.push(shift.clone()),
                _ => groups.push(DayGroup {
                    date: local_date,
                    shifts: vec![shift.clone()],
                }),
            }
        }

        if !groups.iter().any(|group| group.date == today) {
            let position = groups.partition_point(|group| group.date < today);
            groups.insert(
                position,
                DayGroup {
                    date: today,
                    shifts: Vec::new(),
                },
            );
        }

        groups
    }
}
