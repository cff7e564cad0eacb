use crate::domain::records::{JoinedRecord, RecordStore};
use chrono::NaiveDateTime;

/// Latest real check-in for a KR at or before `anchor`, ignoring placeholder
/// rows from the left join. The per-KR index is pre-sorted, so this is a scan
/// from the tail instead of a pass over the whole table.
pub fn latest_checkin_at_or_before<'a>(
    store: &'a RecordStore,
    kr_id: &str,
    anchor: NaiveDateTime,
) -> Option<&'a JoinedRecord> {
    store
        .checkins_for_kr(kr_id)
        .into_iter()
        .rev()
        .find(|row| row.checkin_since.is_some_and(|since| since <= anchor))
}

/// Value a KR had as of `anchor`. Check-ins outside `[floor, anchor]` are out
/// of scope; a KR with none in range reports 0, never "unknown".
pub fn historical_kr_value(
    store: &RecordStore,
    kr_id: &str,
    anchor: NaiveDateTime,
    floor: Option<NaiveDateTime>,
) -> f64 {
    match latest_checkin_at_or_before(store, kr_id, anchor) {
        Some(row) => {
            let in_range = match (floor, row.checkin_since) {
                (Some(floor), Some(since)) => since >= floor,
                _ => true,
            };
            if in_range {
                row.checkin_value
            } else {
                0.0
            }
        }
        None => 0.0,
    }
}
