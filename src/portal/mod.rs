//! Portal client: CAS login, course-catalog scraping, and per-course
//! assignment fetching over one cookie-carrying [`Session`].
//!
//! The HTML extraction is deliberately ad hoc (tag-level regex matching):
//! the portal serves semi-structured markup and every heuristic here is kept
//! behind this module's functions so the matching strategy can change
//! without touching callers.
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::LOCATION;
use reqwest::Response;
use tracing::{debug, warn};

use crate::config::Portal;
use crate::error::SyncError;
use crate::model::{Assignment, Course};
use crate::session::Session;

pub mod model;

use model::AssignmentResponse;

/// Upper bound on CAS ticket redirect hops. Over-following is a safety
/// guard, not a correctness requirement: when the bound is hit we keep the
/// last response and move on.
const MAX_REDIRECT_HOPS: usize = 5;

/// Ephemeral CSRF-style tokens scraped from the CAS login form. Consumed by
/// exactly one login POST and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTokens {
    pub lt: String,
    pub execution: String,
}

static INPUT_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<input[^>]*>").expect("input regex"));
static NAME_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name\s*=\s*"([^"]*)""#).expect("name attr regex"));
static VALUE_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"value\s*=\s*"([^"]*)""#).expect("value attr regex"));
static ANCHOR_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<a\s[^>]*>").expect("anchor regex"));
static SITE_HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href\s*=\s*"[^"]*/portal/site/([\w-]+)"#).expect("site href regex"));
static TITLE_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"title\s*=\s*"([^"]*)""#).expect("title attr regex"));
static ERROR_REGION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<div[^>]*class\s*=\s*"[^"]*\berrors?\b[^"]*""#).expect("error region regex")
});

/// Client for one authenticated portal session.
#[derive(Debug, Clone)]
pub struct PortalClient {
    session: Session,
    portal: Portal,
}

impl PortalClient {
    pub fn new(portal: Portal) -> Self {
        Self::with_session(portal, Session::new())
    }

    pub fn with_session(portal: Portal, session: Session) -> Self {
        Self { session, portal }
    }

    /// Run the CAS login flow.
    ///
    /// GETs the login URL first; a redirect answer means the session cookie
    /// is still valid and credential submission is skipped entirely.
    /// Otherwise the form tokens are scraped, the credentials POSTed, and
    /// any service-ticket redirect chain consumed. Success carries no
    /// explicit signal beyond "no error": the next portal fetch verifies it.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SyncError> {
        let login_url = self.portal.login_url();
        let resp = self.session.get(&login_url).await?;
        if resp.status().is_redirection() {
            debug!("session already authenticated; skipping credential submission");
            return Ok(());
        }

        let body = resp.text().await?;
        let tokens = parse_login_tokens(&body)
            .ok_or_else(|| SyncError::Authentication("failed to extract login tokens".into()))?;

        let form = [
            ("username", username),
            ("password", password),
            ("lt", tokens.lt.as_str()),
            ("execution", tokens.execution.as_str()),
            ("_eventId", "submit"),
        ];
        let resp = self.session.post_form(&login_url, &form).await?;
        let status = resp.status();

        if status.is_redirection() {
            if let Some(location) = header_location(&resp) {
                self.follow_redirect_chain(&location).await?;
            }
            return Ok(());
        }
        if status.is_success() {
            let body = resp.text().await?;
            if has_login_error(&body) {
                return Err(SyncError::InvalidCredentials);
            }
            if is_login_page(&body) {
                return Err(SyncError::Authentication("still on login page".into()));
            }
            // 200 without form markers: logged in without a ticket hop.
            return Ok(());
        }
        Err(SyncError::Authentication(format!(
            "login failed with status {status}"
        )))
    }

    /// Hit the portal root once so any pending CAS ticket redirect gets
    /// consumed and the portal session cookie lands in the jar.
    pub async fn establish_portal_session(&self) -> Result<(), SyncError> {
        let resp = self.session.get(&self.portal.portal_url()).await?;
        if resp.status().is_redirection() {
            if let Some(location) = header_location(&resp) {
                self.follow_redirect_chain(&location).await?;
            }
        }
        Ok(())
    }

    /// Fetch the portal landing page HTML with the session cookies attached.
    pub async fn fetch_portal_html(&self) -> Result<String, SyncError> {
        let resp = self.session.get(&self.portal.portal_url()).await?;
        if resp.status().is_redirection() {
            if let Some(location) = header_location(&resp) {
                self.follow_redirect_chain(&location).await?;
            }
            let resp = self.session.get(&self.portal.portal_url()).await?;
            return Ok(resp.text().await?);
        }
        Ok(resp.text().await?)
    }

    /// Fetch and decode one course's assignment list.
    ///
    /// Malformed JSON degrades to an empty list for this course only: one
    /// broken endpoint must not abort the whole sync. The skip is logged.
    pub async fn fetch_assignments(&self, course: &Course) -> Result<Vec<Assignment>, SyncError> {
        let url = self.portal.assignment_url(&course.site_id);
        let resp = self.session.get(&url).await?;
        let body = resp.text().await?;
        let parsed: AssignmentResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(site_id = %course.site_id, %err, "malformed assignment JSON; skipping course");
                return Ok(Vec::new());
            }
        };
        Ok(parsed
            .assignments
            .into_iter()
            .map(|item| item.into_assignment(course))
            .collect())
    }

    /// Walk a redirect chain, at most [`MAX_REDIRECT_HOPS`] hops. Stops
    /// quietly at the bound; the response reached so far is good enough.
    async fn follow_redirect_chain(&self, initial_location: &str) -> Result<(), SyncError> {
        let mut location = initial_location.to_string();
        for _ in 0..MAX_REDIRECT_HOPS {
            let resp = self.session.get(&location).await?;
            if !resp.status().is_redirection() {
                return Ok(());
            }
            match header_location(&resp) {
                Some(next) => location = next,
                None => return Ok(()),
            }
        }
        debug!("redirect chain exceeded {MAX_REDIRECT_HOPS} hops; giving up on following");
        Ok(())
    }
}

fn header_location(resp: &Response) -> Option<String> {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Value of the `<input name=...>` field named `name`, if present at all.
/// Returns `Some("")` for a present-but-blank value.
fn input_value(html: &str, name: &str) -> Option<String> {
    for tag in INPUT_TAG_RE.find_iter(html) {
        let tag = tag.as_str();
        let field = NAME_ATTR_RE.captures(tag).map(|c| c[1].to_string());
        if field.as_deref() == Some(name) {
            let value = VALUE_ATTR_RE
                .captures(tag)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            return Some(value);
        }
    }
    None
}

/// Scrape the CAS form tokens. `None` when either field is missing or blank.
pub fn parse_login_tokens(html: &str) -> Option<LoginTokens> {
    let lt = input_value(html, "lt")?;
    let execution = input_value(html, "execution")?;
    if lt.trim().is_empty() || execution.trim().is_empty() {
        return None;
    }
    Some(LoginTokens { lt, execution })
}

/// Heuristic: a body carrying both CAS form fields is still the login page.
pub fn is_login_page(html: &str) -> bool {
    input_value(html, "lt").is_some() && input_value(html, "execution").is_some()
}

/// Heuristic: CAS renders credential failures inside an error-classed div.
pub fn has_login_error(html: &str) -> bool {
    ERROR_REGION_RE.is_match(html)
}

/// Extract the course catalog from the portal HTML.
///
/// Matches every anchor whose href carries a `/portal/site/<id>` segment and
/// whose `title` attribute is non-empty; anything malformed is silently
/// skipped. Document order is preserved.
pub fn parse_courses(html: &str) -> Vec<Course> {
    ANCHOR_TAG_RE
        .find_iter(html)
        .filter_map(|tag| {
            let tag = tag.as_str();
            let site_id = SITE_HREF_RE.captures(tag)?[1].to_string();
            let title = TITLE_ATTR_RE.captures(tag)?[1].trim().to_string();
            if title.is_empty() {
                return None;
            }
            Some(Course { site_id, title })
        })
        .collect()
}
