//! Snapshot reconciliation: pure functions, no I/O.
use std::collections::{HashMap, HashSet};

use crate::model::{Assignment, ReconcileOutcome, Snapshot};

/// New assignments due within this many seconds count as urgent (3 hours).
pub const URGENT_WINDOW_SECS: i64 = 3 * 60 * 60;

/// Compare a fresh fetch against the previous snapshot.
///
/// - de-duplicates `fresh` by id, first occurrence wins
/// - "new" = ids absent from `previous`, split into urgent
///   (`0 < due - now <= URGENT_WINDOW_SECS`) and regular (everything else,
///   including undated items)
/// - "resubmitted" = ids present before as unsubmitted, submitted now
/// - `saved` is the de-duplicated set stamped with `now`, ready to persist
pub fn reconcile(previous: &Snapshot, fresh: Vec<Assignment>, now: i64) -> ReconcileOutcome {
    let mut seen = HashSet::new();
    let distinct: Vec<Assignment> = fresh
        .into_iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect();

    let previous_submitted: HashMap<&str, bool> = previous
        .assignments
        .iter()
        .map(|a| (a.id.as_str(), a.is_submitted))
        .collect();

    let mut new_assignments = Vec::new();
    let mut urgent_assignments = Vec::new();
    let mut resubmitted_assignments = Vec::new();

    for assignment in &distinct {
        match previous_submitted.get(assignment.id.as_str()) {
            None => {
                if is_urgent(assignment, now) {
                    urgent_assignments.push(assignment.clone());
                } else {
                    new_assignments.push(assignment.clone());
                }
            }
            Some(was_submitted) => {
                if !was_submitted && assignment.is_submitted {
                    resubmitted_assignments.push(assignment.clone());
                }
            }
        }
    }

    ReconcileOutcome {
        saved: Snapshot {
            assignments: distinct,
            last_updated_seconds: Some(now),
        },
        new_assignments,
        urgent_assignments,
        resubmitted_assignments,
    }
}

/// Strictly-future deadline inside the urgency window; the window edge
/// itself is urgent, `now` and the past are not.
fn is_urgent(assignment: &Assignment, now: i64) -> bool {
    match assignment.due_time_seconds {
        Some(due) => due > now && due - now <= URGENT_WINDOW_SECS,
        None => false,
    }
}

/// Display ordering: upcoming deadlines ascending, then everything past or
/// undated with the most recent deadline first.
pub fn sort_for_display(assignments: &[Assignment], now: i64) -> Vec<Assignment> {
    let (mut future, mut past): (Vec<Assignment>, Vec<Assignment>) = assignments
        .iter()
        .cloned()
        .partition(|a| a.due_time_seconds.is_some_and(|due| due > now));

    future.sort_by_key(|a| a.due_time_seconds);
    past.sort_by_key(|a| std::cmp::Reverse(a.due_time_seconds));

    future.into_iter().chain(past).collect()
}
