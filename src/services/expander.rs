//! Expansion of weekly recurrence rules into concrete half-hour slots.
//!
//! Everything here is pure: the caller injects `now` and no store is
//! touched. Dates and times are naive wall-clock values.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::models::rule::{format_clock, RecurrenceRule};
use crate::models::slot::GeneratedSlot;

pub const SLOT_MINUTES: u32 = 30;

/// Slots generated for a range plus the number of rule/day occurrences
/// that were skipped because the rule was malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub slots: Vec<GeneratedSlot>,
    pub skipped: usize,
}

/// Expands `rules` over the inclusive range `[range_start, range_end]`.
///
/// The result is ordered by date then time. Overlapping rules may yield the
/// same slot more than once; reconciliation takes care of duplicates.
pub fn expand(
    rules: &[RecurrenceRule],
    range_start: NaiveDate,
    range_end: NaiveDate,
    now: NaiveDateTime,
) -> Vec<GeneratedSlot> {
    expand_with_report(rules, range_start, range_end, now).slots
}

pub fn expand_with_report(
    rules: &[RecurrenceRule],
    range_start: NaiveDate,
    range_end: NaiveDate,
    now: NaiveDateTime,
) -> Expansion {
    let mut expansion = Expansion::default();

    for day in range_start.iter_days().take_while(|d| *d <= range_end) {
        let mut day_slots = Vec::new();

        for rule in rules.iter().filter(|r| r.enabled && r.matches_weekday(day)) {
            match slots_for_day(rule, day, now) {
                Ok(slots) => day_slots.extend(slots),
                Err(e) => {
                    warn!(
                        "Skipping rule {} on {}: {}",
                        rule.id.as_deref().unwrap_or("<unsaved>"),
                        day,
                        e
                    );
                    expansion.skipped += 1;
                }
            }
        }

        // Stable, so duplicates from overlapping rules stay adjacent.
        day_slots.sort_by(|a: &GeneratedSlot, b| a.time.cmp(&b.time));
        expansion.slots.extend(day_slots);
    }

    debug!(
        "Expanded {} rules over {}..={} into {} slots ({} skipped)",
        rules.len(),
        range_start,
        range_end,
        expansion.slots.len(),
        expansion.skipped
    );

    expansion
}

fn slots_for_day(
    rule: &RecurrenceRule,
    day: NaiveDate,
    now: NaiveDateTime,
) -> Result<Vec<GeneratedSlot>, crate::error::RuleError> {
    if !rule.is_active_on(day, now)? {
        return Ok(Vec::new());
    }

    let (start, end) = rule.window_minutes()?;
    Ok((start..end)
        .step_by(SLOT_MINUTES as usize)
        .map(|minutes| GeneratedSlot::new(day, format_clock(minutes)))
        .collect())
}
