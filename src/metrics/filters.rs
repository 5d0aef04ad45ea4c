//! Scope and period membership tests.

use crate::models::{Owned, Period, Scope};
use chrono::{Datelike, FixedOffset, Local, NaiveDate, Utc};

// ── Scope ─────────────────────────────────────────────────────────────────────

/// Whether a record is attributable to `scope`.
///
/// Individual scope compares owner ids when both sides carry one and falls
/// back to exact, case-sensitive owner-name equality. An empty selection
/// matches nothing.
pub fn matches_scope<T: Owned>(record: &T, scope: &Scope) -> bool {
    match scope {
        Scope::All => true,
        Scope::Team(team) => !team.is_empty() && record.team() == Some(team.as_str()),
        Scope::Individual { name, rep_id } => {
            let selected_id = rep_id.as_deref().filter(|id| !id.is_empty());
            if let (Some(selected), Some(owner_id)) = (selected_id, record.owner_id()) {
                return selected == owner_id;
            }
            !name.is_empty() && record.owner() == Some(name.as_str())
        }
    }
}

pub fn filter_by_scope<'a, T: Owned>(records: &'a [T], scope: &Scope) -> Vec<&'a T> {
    records.iter().filter(|r| matches_scope(*r, scope)).collect()
}

// ── Period ────────────────────────────────────────────────────────────────────

fn quarter_of(date: NaiveDate) -> u32 {
    date.month0() / 3
}

pub fn in_period(date: NaiveDate, period: Period, today: NaiveDate) -> bool {
    match period {
        Period::Year => date.year() == today.year(),
        Period::Quarter => date.year() == today.year() && quarter_of(date) == quarter_of(today),
        Period::Month => date.year() == today.year() && date.month() == today.month(),
        Period::Unbounded => true,
    }
}

/// A missing date is only inside the unbounded window.
pub fn date_in_period(date: Option<NaiveDate>, period: Period, today: NaiveDate) -> bool {
    match date {
        Some(d) => in_period(d, period, today),
        None => period == Period::Unbounded,
    }
}

/// "Today" in the organization's zone, or the local zone when unset.
pub fn today_in(utc_offset_minutes: Option<i32>) -> NaiveDate {
    match utc_offset_minutes.and_then(|m| FixedOffset::east_opt(m * 60)) {
        Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
        None => Local::now().date_naive(),
    }
}
