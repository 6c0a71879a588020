//! Synthetic CAS + portal server for protocol tests, served by tiny_http on
//! an OS-assigned port from a background thread.
use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

const LOGIN_FORM: &str = r#"<html><body><form id="fm1" action="/cas/login" method="post">
<input type="text" name="username" value="" />
<input type="password" name="password" value="" />
<input type="hidden" name="lt" value="LT-TOKEN1" />
<input type="hidden" name="execution" value="e1" />
</form></body></html>"#;

const ERROR_PAGE: &str =
    r#"<html><body><div id="msg" class="errors">The credentials you provided cannot be determined to be authentic.</div></body></html>"#;

/// How the stub answers the CAS endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginBehavior {
    /// GET serves the form; POST 302s to a ticket URL that answers 200.
    Success,
    /// GET itself redirects straight to the portal (valid session cookie).
    AlreadyAuthenticated,
    /// POST answers 200 with an error-classed div.
    InvalidCredentials,
    /// POST answers 200 with the login form again.
    StillLoginPage,
    /// POST 302s into a chain of this many redirect hops.
    RedirectChain(usize),
    /// GET serves a page with no form fields at all.
    NoTokens,
}

pub struct PortalStub {
    pub base_url: String,
    shutdown: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
    hop_hits: Arc<AtomicUsize>,
    login_posts: Arc<Mutex<Vec<String>>>,
    assignments: Arc<Mutex<HashMap<String, String>>>,
}

impl PortalStub {
    pub fn spawn(behavior: LoginBehavior, portal_html: &str) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start portal stub");
        let base_url = format!("http://{}", server.server_addr());
        let portal_html = portal_html.to_string();

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let hop_hits = Arc::new(AtomicUsize::new(0));
        let login_posts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let assignments: Arc<Mutex<HashMap<String, String>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let hops = Arc::clone(&hop_hits);
        let posts = Arc::clone(&login_posts);
        let payloads = Arc::clone(&assignments);
        let base = base_url.clone();

        let handle = thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let url = request.url().to_string();
            let path = url.split('?').next().unwrap_or(&url).to_string();
            let is_post = request.method() == &tiny_http::Method::Post;

            if path == "/cas/login" && !is_post {
                let _ = match behavior {
                    LoginBehavior::AlreadyAuthenticated => {
                        request.respond(redirect(&format!("{base}/portal")))
                    }
                    LoginBehavior::NoTokens => request.respond(tiny_http::Response::from_string(
                        "<html><body>maintenance</body></html>",
                    )),
                    _ => request.respond(tiny_http::Response::from_string(LOGIN_FORM)),
                };
                continue;
            }

            if path == "/cas/login" && is_post {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                posts.lock().unwrap().push(body);
                let _ = match behavior {
                    LoginBehavior::InvalidCredentials => {
                        request.respond(tiny_http::Response::from_string(ERROR_PAGE))
                    }
                    LoginBehavior::StillLoginPage => {
                        request.respond(tiny_http::Response::from_string(LOGIN_FORM))
                    }
                    LoginBehavior::RedirectChain(_) => {
                        request.respond(redirect(&format!("{base}/hop/1")))
                    }
                    _ => request.respond(redirect(&format!("{base}/ticket?ST-abc"))),
                };
                continue;
            }

            if path == "/ticket" {
                let _ = request.respond(tiny_http::Response::from_string(
                    "<html><body>ticket consumed</body></html>",
                ));
                continue;
            }

            if let Some(n) = path.strip_prefix("/hop/") {
                hops.fetch_add(1, Ordering::SeqCst);
                let n: usize = n.parse().unwrap_or(0);
                let chain_len = match behavior {
                    LoginBehavior::RedirectChain(len) => len,
                    _ => 0,
                };
                let _ = if n < chain_len {
                    request.respond(redirect(&format!("{base}/hop/{}", n + 1)))
                } else {
                    request.respond(tiny_http::Response::from_string("end of chain"))
                };
                continue;
            }

            if path == "/portal" {
                let _ = request.respond(tiny_http::Response::from_string(portal_html.clone()));
                continue;
            }

            if let Some(site) = path
                .strip_prefix("/direct/assignment/site/")
                .and_then(|rest| rest.strip_suffix(".json"))
            {
                let body = payloads.lock().unwrap().get(site).cloned();
                let _ = match body {
                    Some(body) => request.respond(tiny_http::Response::from_string(body)),
                    None => request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    ),
                };
                continue;
            }

            let _ = request
                .respond(tiny_http::Response::from_string("not found").with_status_code(404));
        });

        Self {
            base_url,
            shutdown: shutdown_tx,
            handle: Some(handle),
            hop_hits,
            login_posts,
            assignments,
        }
    }

    /// Set the JSON body served for one course's assignment endpoint.
    pub fn set_assignments(&self, site_id: &str, body: &str) {
        self.assignments
            .lock()
            .unwrap()
            .insert(site_id.to_string(), body.to_string());
    }

    /// Number of `/hop/<n>` redirect hops the client actually followed.
    pub fn hops_followed(&self) -> usize {
        self.hop_hits.load(Ordering::SeqCst)
    }

    /// Raw bodies of every login POST received.
    pub fn login_posts(&self) -> Vec<String> {
        self.login_posts.lock().unwrap().clone()
    }
}

impl Drop for PortalStub {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn redirect(location: &str) -> tiny_http::Response<std::io::Empty> {
    let header = tiny_http::Header::from_bytes(&b"Location"[..], location.as_bytes())
        .expect("location header");
    tiny_http::Response::empty(302).with_header(header)
}

/// Portal landing page with two course anchors from different terms.
pub fn two_course_portal_html() -> String {
    r#"<html><body>
<a href="/portal/site/site-123?panel=Main" title="[2025後期]CS101">CS101</a>
<a href="/portal/site/site-456?panel=Main" title="[2024前期]OldCourse">OldCourse</a>
</body></html>"#
        .to_string()
}
