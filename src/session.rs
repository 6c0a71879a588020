use reqwest::{Client, Response};

use crate::error::SyncError;

/// Cookie-persisting HTTP transport for the CAS/portal flow.
///
/// Redirects are never followed automatically: the login flow has to inspect
/// each 3xx hop itself (an "already authenticated" session answers the login
/// GET with a redirect, and the service ticket travels in a `Location`
/// header). Cookies are stored per host by reqwest's jar and replayed on
/// every request through the same `Session`.
///
/// One `Session` owns the server-side session state for one account; it is
/// cheap to clone but clones share the same jar, so never drive two logins
/// through clones concurrently.
#[derive(Debug, Clone)]
pub struct Session {
    http: Client,
}

impl Session {
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent("panda-watch/0.1")
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("reqwest client");
        Self { http }
    }

    /// GET `url`. Non-2xx/3xx statuses are returned as-is; only transport
    /// failures become errors.
    pub async fn get(&self, url: &str) -> Result<Response, SyncError> {
        Ok(self.http.get(url).send().await?)
    }

    /// POST `form` as `application/x-www-form-urlencoded` to `url`.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<Response, SyncError> {
        Ok(self.http.post(url).form(form).send().await?)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
