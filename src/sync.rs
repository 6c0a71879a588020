//! Sync orchestrator: drives login → scrape → fetch as one operation and
//! runs the full reconcile-persist-notify cycle.
use anyhow::Result;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::config::Portal;
use crate::db::{self, Pool};
use crate::error::SyncError;
use crate::model::{Assignment, Course, ReconcileOutcome};
use crate::notify::Notifier;
use crate::portal::{is_login_page, parse_courses, PortalClient};
use crate::reconcile::reconcile;

/// One sync engine per portal account. The in-flight lock serializes whole
/// fetch runs: the cookie jar and any pending CAS ticket are server-side
/// state that a second concurrent login would invalidate.
pub struct SyncEngine {
    client: PortalClient,
    term_filter: String,
    in_flight: Mutex<()>,
}

impl SyncEngine {
    pub fn new(portal: Portal) -> Self {
        let term_filter = portal.term_filter.clone();
        Self {
            client: PortalClient::new(portal),
            term_filter,
            in_flight: Mutex::new(()),
        }
    }

    /// Log in (a no-op for a still-valid session), scrape the course
    /// catalog, and fetch every matching course's assignments.
    ///
    /// Rejects with [`SyncError::Busy`] while another fetch is running.
    /// Returns the flattened, un-deduplicated assignment list; duplicate
    /// ids are the reconciler's problem.
    pub async fn fetch_assignments(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Vec<Assignment>, SyncError> {
        let _guard = self.in_flight.try_lock().map_err(|_| SyncError::Busy)?;

        self.client.login(username, password).await?;
        self.client.establish_portal_session().await?;

        let html = self.client.fetch_portal_html().await?;
        if is_login_page(&html) {
            // A 200 can still be the login form; never scrape it as a catalog.
            return Err(SyncError::Authentication("still on CAS login page".into()));
        }

        let courses: Vec<Course> = filter_courses(parse_courses(&html), &self.term_filter)
            .into_iter()
            .map(|course| Course {
                title: strip_term_prefix(&course.title),
                ..course
            })
            .collect();
        info!(count = courses.len(), "syncing courses");

        // Course endpoints are independent; fetch them in parallel.
        let fetches = courses
            .iter()
            .map(|course| self.client.fetch_assignments(course));
        let mut assignments = Vec::new();
        for result in futures::future::join_all(fetches).await {
            assignments.extend(result?);
        }
        Ok(assignments)
    }
}

/// Keep only courses whose raw title contains the configured term marker.
/// An empty marker keeps everything.
pub fn filter_courses(courses: Vec<Course>, term_filter: &str) -> Vec<Course> {
    courses
        .into_iter()
        .filter(|c| c.title.contains(term_filter))
        .collect()
}

/// Strip a leading bracketed term tag, e.g. `[2025後期]Algorithms` →
/// `Algorithms`. Titles without one pass through untouched.
pub fn strip_term_prefix(title: &str) -> String {
    let trimmed = title.trim();
    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some((_, after)) = rest.split_once(']') {
            return after.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// One full cycle: fetch, reconcile against the stored snapshot, persist,
/// notify. Returns `None` when no credentials are stored.
///
/// Notifier failures are logged and swallowed; the snapshot has already
/// been saved by then and a broken delivery channel must not fail the sync.
#[instrument(skip_all)]
pub async fn run_sync_cycle(
    pool: &Pool,
    engine: &SyncEngine,
    notifier: &dyn Notifier,
) -> Result<Option<ReconcileOutcome>> {
    let Some(credentials) = db::load_credentials(pool).await? else {
        info!("no credentials stored; skipping sync");
        return Ok(None);
    };

    let fresh = engine
        .fetch_assignments(&credentials.username, &credentials.password)
        .await?;
    let previous = db::load_snapshot(pool).await?;

    let now = Utc::now().timestamp();
    let outcome = reconcile(&previous, fresh, now);
    db::save_snapshot(pool, &outcome.saved).await?;
    info!(
        total = outcome.saved.assignments.len(),
        new = outcome.new_assignments.len(),
        urgent = outcome.urgent_assignments.len(),
        resubmitted = outcome.resubmitted_assignments.len(),
        "sync cycle complete"
    );

    if !outcome.new_assignments.is_empty() {
        if let Err(err) = notifier.notify_new(&outcome.new_assignments).await {
            warn!(?err, "failed to deliver new-assignment notifications");
        }
    }
    if !outcome.urgent_assignments.is_empty() {
        if let Err(err) = notifier.notify_urgent(&outcome.urgent_assignments).await {
            warn!(?err, "failed to deliver urgent notifications");
        }
    }
    if !outcome.resubmitted_assignments.is_empty() {
        if let Err(err) = notifier
            .notify_submitted(&outcome.resubmitted_assignments)
            .await
        {
            warn!(?err, "failed to deliver submission notifications");
        }
    }

    Ok(Some(outcome))
}
