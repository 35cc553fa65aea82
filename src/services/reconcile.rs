use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, error, info, warn};

use crate::error::{Result, ServiceError, StoreError};
use crate::models::slot::{GeneratedSlot, ReconcileReport};
use crate::services::expander::expand_with_report;
use crate::store::{RuleStore, SlotStore};

/// Inserts every generated slot that the store does not have yet.
///
/// Slots are processed in order, one existence check and at most one insert
/// each. A store failure stops the run and is returned; slots inserted
/// before the failure stay in place, so running again completes the batch.
pub fn reconcile(store: &dyn SlotStore, slots: &[GeneratedSlot]) -> Result<ReconcileReport> {
    let mut report = ReconcileReport {
        generated: slots.len(),
        ..ReconcileReport::default()
    };

    for slot in slots {
        if store.exists(slot.date, &slot.time)? {
            report.already_present += 1;
            continue;
        }

        match store.insert(slot.date, &slot.time, true) {
            Ok(created) => {
                debug!("Created slot {}", created.id);
                report.created += 1;
            }
            Err(StoreError::Conflict(msg)) => {
                // Another run inserted it between the check and the insert.
                warn!("Slot {} {} appeared concurrently: {}", slot.date, slot.time, msg);
                report.already_present += 1;
            }
            Err(StoreError::Unavailable(msg)) => {
                error!(
                    "Failed to insert slot {} {} after creating {}: {}",
                    slot.date, slot.time, report.created, msg
                );
                return Err(ServiceError::StoreUnavailable(msg));
            }
        }
    }

    info!(
        "Reconciled {} generated slots: {} created, {} already present",
        report.generated, report.created, report.already_present
    );
    Ok(report)
}

/// Loads the current rules, expands them over the inclusive range and
/// materializes the result.
pub fn apply_rules(
    rules: &dyn RuleStore,
    slots: &dyn SlotStore,
    range_start: NaiveDate,
    range_end: NaiveDate,
    now: NaiveDateTime,
) -> Result<ReconcileReport> {
    if range_end < range_start {
        return Err(ServiceError::Validation(format!(
            "End date {} is before start date {}",
            range_end, range_start
        )));
    }

    let loaded = rules.load_rules()?;
    info!(
        "Applying {} recurrence rules to {}..={}",
        loaded.len(),
        range_start,
        range_end
    );

    let expansion = expand_with_report(&loaded, range_start, range_end, now);
    if expansion.skipped > 0 {
        warn!(
            "{} rule occurrences skipped as malformed while applying rules",
            expansion.skipped
        );
    }

    reconcile(slots, &expansion.slots)
}
