use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::TimeSlot;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub price: i64,
    pub current_patient: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScheduleQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScheduleRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time_slots: Vec<TimeSlot>,
}

/// Set difference between the requested and existing slots of a day:
/// returns `(to_add, to_remove)`. Duplicates in the request collapse.
pub fn diff_slots(requested: &[TimeSlot], existing: &[TimeSlot]) -> (Vec<TimeSlot>, Vec<TimeSlot>) {
    let requested: HashSet<TimeSlot> = requested.iter().copied().collect();
    let existing: HashSet<TimeSlot> = existing.iter().copied().collect();

    let mut to_add: Vec<TimeSlot> = requested.difference(&existing).copied().collect();
    let mut to_remove: Vec<TimeSlot> = existing.difference(&requested).copied().collect();
    to_add.sort();
    to_remove.sort();

    (to_add, to_remove)
}

/// Slots that cannot be removed because bookings still reference them.
pub fn blocked_removals(to_remove: &[TimeSlot], booked: &[TimeSlot]) -> Vec<TimeSlot> {
    to_remove
        .iter()
        .copied()
        .filter(|slot| booked.contains(slot))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use TimeSlot::*;

    #[test]
    fn diff_adds_and_removes() {
        let (add, remove) = diff_slots(&[T1, T2, T5], &[T2, T3]);

        assert_eq!(add, vec![T1, T5]);
        assert_eq!(remove, vec![T3]);
    }

    #[test]
    fn diff_identical_sets_is_noop() {
        let (add, remove) = diff_slots(&[T1, T2], &[T2, T1]);

        assert!(add.is_empty());
        assert!(remove.is_empty());
    }

    #[test]
    fn diff_empty_request_clears_day() {
        let (add, remove) = diff_slots(&[], &[T4, T8]);

        assert!(add.is_empty());
        assert_eq!(remove, vec![T4, T8]);
    }

    #[test]
    fn diff_ignores_duplicates_in_request() {
        let (add, remove) = diff_slots(&[T1, T1, T1], &[]);

        assert_eq!(add, vec![T1]);
        assert!(remove.is_empty());
    }

    #[test]
    fn booked_slots_block_removal() {
        assert_eq!(blocked_removals(&[T1, T2, T3], &[T2]), vec![T2]);
        assert!(blocked_removals(&[T1, T3], &[T2]).is_empty());
        assert!(blocked_removals(&[], &[T1, T2]).is_empty());
    }
}
