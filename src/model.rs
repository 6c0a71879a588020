use serde::{Deserialize, Serialize};

/// A course site discovered on the portal page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Stable portal-internal identifier, used to build the assignment URL.
    pub site_id: String,
    /// Raw display title, possibly bracket-prefixed (e.g. `[2025後期]Algorithms`).
    pub title: String,
}

/// One assignment as seen in a single fetch. Never mutated in place;
/// reconciliation compares immutable snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub title: String,
    /// Due time in epoch seconds; the server may omit it at any level.
    pub due_time_seconds: Option<i64>,
    pub status: Option<String>,
    /// Course display title with any leading bracketed term tag stripped.
    pub course_name: String,
    pub course_id: String,
    /// True iff at least one submission entry carried the user-submission flag.
    #[serde(default)]
    pub is_submitted: bool,
}

/// The persisted assignment set plus the time it was last refreshed.
///
/// Invariant: `assignments` contains each `id` at most once (the reconciler
/// de-duplicates before building one).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub assignments: Vec<Assignment>,
    pub last_updated_seconds: Option<i64>,
}

/// Output of one reconciliation pass.
///
/// `new_assignments` and `urgent_assignments` are disjoint and together are
/// exactly the assignments absent from the previous snapshot. Resubmissions
/// were present before, so they never overlap either "new" bucket.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// The snapshot to persist (de-duplicated fresh set, stamped with `now`).
    pub saved: Snapshot,
    pub new_assignments: Vec<Assignment>,
    pub urgent_assignments: Vec<Assignment>,
    pub resubmitted_assignments: Vec<Assignment>,
}
