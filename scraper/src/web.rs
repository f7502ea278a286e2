//! A small web front-end: submit a channel, watch progress, download the CSV.
//!
//! Jobs live in memory only and are lost when the server exits. Finished jobs, and the CSV
//! they hold, are dropped [`JOB_TTL`] after they finish. Each submitted scrape runs
//! on its own background task; the results page polls `/status/{id}` until the job is
//! completed or failed.

use crate::config::{API_KEY_ENV, ApiKey, ScraperConfig, WEB_API_KEY_ENV, api_key_from_env};
use crate::error::ScrapeError;
use crate::export::{default_file_name, to_csv_bytes};
use crate::pipeline::{Progress, Scraper};
use bytes::Bytes;
use eyre::Context;
use http::header::{self, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

const INDEX_HTML: &str = include_str!("../assets/index.html");
const RESULTS_HTML: &str = include_str!("../assets/results.html");

/// Upper bound on a submitted form body.
const MAX_FORM_BYTES: usize = 16 * 1024;

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Error,
}

/// The JSON document served at `/status/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub status: JobState,
    /// Videos processed so far.
    pub progress: usize,
    /// Videos to process, once known.
    pub total: usize,
    /// Title of the video being processed.
    pub current: String,
    pub message: String,
    pub error: Option<String>,
}

impl JobStatus {
    fn pending() -> Self {
        Self {
            status: JobState::Pending,
            progress: 0,
            total: 0,
            current: String::new(),
            message: "Initializing...".to_string(),
            error: None,
        }
    }

    /// Folds a pipeline progress notification into the status.
    pub fn apply(&mut self, progress: &Progress) {
        match progress {
            Progress::Resolved { title, .. } => {
                self.message = format!("Found channel: {title}");
            }
            Progress::Listing { found } => {
                self.message = format!("Found {found} videos so far...");
            }
            Progress::Listed { total } => {
                self.total = *total;
                self.message = format!("Found {total} videos. Fetching details...");
            }
            Progress::Video {
                index,
                total,
                title,
                ..
            } => {
                self.progress = *index;
                self.total = *total;
                self.current = truncate(title, 50);
                self.message = format!("Processing video {index}/{total}: {}", self.current);
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}

/// How long a completed or failed job stays downloadable.
pub const JOB_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct Job {
    status: JobStatus,
    channel_id: Option<String>,
    csv: Option<Bytes>,
    finished_at: Option<Instant>,
}

/// Shared server state: configuration plus the in-memory job table.
#[derive(Debug)]
pub struct AppState {
    config: ScraperConfig,
    /// Used when a form arrives without a key.
    fallback_key: Option<ApiKey>,
    jobs: Mutex<HashMap<String, Job>>,
}

impl AppState {
    pub fn new(config: ScraperConfig, fallback_key: Option<ApiKey>) -> Self {
        Self {
            config,
            fallback_key,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// State configured from the environment, including the fallback API key.
    pub fn from_env() -> Self {
        Self::new(
            ScraperConfig::from_env(),
            api_key_from_env(&[WEB_API_KEY_ENV, API_KEY_ENV]),
        )
    }

    /// The current status of a job, if it exists.
    pub fn job_status(&self, id: &str) -> Option<JobStatus> {
        self.jobs().get(id).map(|job| job.status.clone())
    }

    fn jobs(&self) -> std::sync::MutexGuard<'_, HashMap<String, Job>> {
        // Every update is a plain field assignment, so a poisoned table is still consistent.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut Job)) {
        if let Some(job) = self.jobs().get_mut(id) {
            f(job);
        }
    }

    fn insert_job(&self) -> String {
        if let Some(cutoff) = Instant::now().checked_sub(JOB_TTL) {
            self.prune_finished_before(cutoff);
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.jobs().insert(
            id.clone(),
            Job {
                status: JobStatus::pending(),
                channel_id: None,
                csv: None,
                finished_at: None,
            },
        );
        id
    }

    /// Drops jobs that finished before `cutoff`. Running jobs are kept.
    fn prune_finished_before(&self, cutoff: Instant) {
        let mut jobs = self.jobs();
        let before = jobs.len();
        jobs.retain(|_, job| job.finished_at.is_none_or(|at| at >= cutoff));
        let pruned = before - jobs.len();
        if pruned > 0 {
            tracing::debug!(pruned, "dropped expired jobs");
        }
    }
}

/// Serves the web UI on `listener` until an accept fails.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> eyre::Result<()> {
    let addr = listener.local_addr().context("get local address")?;
    tracing::info!(%addr, "web UI listening");

    loop {
        let (conn, peer) = listener.accept().await.context("accept")?;
        let conn = TokioIo::new(conn);
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(route(state, req).await) }
            });
            if let Err(e) = http1::Builder::new().serve_connection(conn, service).await {
                tracing::debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }
}

async fn route(state: Arc<AppState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    tracing::debug!(%method, path = %path, "request");

    match (method, segments.as_slice()) {
        (Method::GET, [""]) => index(&state, None),
        (Method::POST, ["scrape"]) => start_scrape(state, req).await,
        (Method::GET, ["results", id]) => results(&state, id),
        (Method::GET, ["status", id]) => status(&state, id),
        (Method::GET, ["download", id]) => download(&state, id),
        _ => text(StatusCode::NOT_FOUND, "Not found"),
    }
}

fn index(state: &AppState, error: Option<&str>) -> Response<Full<Bytes>> {
    let error = error
        .map(|e| format!("<p class=\"error\">{}</p>", escape_html(e)))
        .unwrap_or_default();
    let key_hint = if state.fallback_key.is_some() {
        "<p class=\"hint\">Leave empty to use the server's configured key.</p>"
    } else {
        ""
    };
    let page = INDEX_HTML
        .replace("{{error}}", &error)
        .replace("{{key_hint}}", key_hint);
    let status = if error.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    html(status, page)
}

async fn start_scrape(state: Arc<AppState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let body = match Limited::new(req.into_body(), MAX_FORM_BYTES).collect().await {
        Ok(body) => body.to_bytes(),
        Err(e) => {
            tracing::debug!(error = %e, "could not read form body");
            return text(StatusCode::BAD_REQUEST, "Could not read form");
        }
    };

    let mut channel_url = String::new();
    let mut api_key = String::new();
    for (k, v) in form_urlencoded::parse(&body) {
        match &*k {
            "channel_url" => channel_url = v.trim().to_string(),
            "api_key" => api_key = v.into_owned(),
            _ => {}
        }
    }

    if channel_url.is_empty() {
        return index(&state, Some("Please enter a channel URL."));
    }
    let Some(api_key) = ApiKey::new(api_key).or_else(|| state.fallback_key.clone()) else {
        return index(&state, Some("Please enter a YouTube Data API key."));
    };

    let id = state.insert_job();
    tracing::info!(job = %id, channel = %channel_url, "starting scrape job");
    match Scraper::from_config(api_key, &state.config) {
        Ok(scraper) => {
            tokio::spawn(run_job(Arc::clone(&state), id.clone(), scraper, channel_url));
        }
        Err(e) => fail_job(&state, &id, &e),
    }

    redirect(&format!("/results/{id}"))
}

async fn run_job(state: Arc<AppState>, id: String, scraper: Scraper, channel_url: String) {
    state.update(&id, |job| {
        job.status.status = JobState::Running;
        job.status.message = "Connecting to YouTube API...".to_string();
    });

    let outcome = scraper
        .scrape(&channel_url, |progress| {
            state.update(&id, |job| {
                if let Progress::Resolved { channel_id, .. } = &progress {
                    job.channel_id = Some(channel_id.clone());
                }
                job.status.apply(&progress);
            });
        })
        .await
        .and_then(|scrape| Ok((to_csv_bytes(&scrape.records)?, scrape.records.len())));

    match outcome {
        Ok((csv, count)) => {
            tracing::info!(job = %id, videos = count, "scrape job completed");
            state.update(&id, |job| {
                job.status.status = JobState::Completed;
                job.status.progress = count;
                job.status.total = count;
                job.status.message = if count == 0 {
                    "No videos found in this channel.".to_string()
                } else {
                    format!("Successfully scraped {count} videos!")
                };
                job.csv = (count > 0).then(|| Bytes::from(csv));
                job.finished_at = Some(Instant::now());
            });
        }
        Err(e) => fail_job(&state, &id, &e),
    }
}

fn fail_job(state: &AppState, id: &str, e: &ScrapeError) {
    tracing::warn!(job = %id, error = %e, "scrape job failed");
    state.update(id, |job| {
        job.status.status = JobState::Error;
        job.status.message = format!("Error: {e}");
        job.status.error = Some(e.to_string());
        job.finished_at = Some(Instant::now());
    });
}

fn results(state: &AppState, id: &str) -> Response<Full<Bytes>> {
    if state.job_status(id).is_none() {
        return redirect("/");
    }
    html(StatusCode::OK, RESULTS_HTML.replace("{{job_id}}", &escape_html(id)))
}

fn status(state: &AppState, id: &str) -> Response<Full<Bytes>> {
    match state.job_status(id) {
        Some(status) => json(StatusCode::OK, &status),
        None => json(
            StatusCode::NOT_FOUND,
            &serde_json::json!({ "error": "Job not found" }),
        ),
    }
}

fn download(state: &AppState, id: &str) -> Response<Full<Bytes>> {
    let (csv, channel_id) = {
        let jobs = state.jobs();
        let Some(job) = jobs.get(id) else {
            return redirect("/");
        };
        (job.csv.clone(), job.channel_id.clone())
    };
    // Only completed jobs with at least one row carry a CSV.
    let Some(csv) = csv else {
        return redirect(&format!("/results/{id}"));
    };

    let file_name = default_file_name(channel_id.as_deref().unwrap_or("data"));
    let disposition = format!("attachment; filename=\"{}\"", file_name.display());
    let mut response = Response::new(Full::new(csv));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    match HeaderValue::try_from(disposition) {
        Ok(value) => {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        Err(e) => tracing::warn!(error = %e, "unrepresentable download file name"),
    }
    response
}

fn html(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    with_type(status, Bytes::from(body), "text/html; charset=utf-8")
}

fn text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    with_type(status, Bytes::from_static(body.as_bytes()), "text/plain; charset=utf-8")
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => with_type(status, Bytes::from(body), "application/json"),
        Err(e) => {
            tracing::error!(error = %e, "could not serialize response");
            text(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

fn with_type(status: StatusCode, body: Bytes, content_type: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn redirect(location: &str) -> Response<Full<Bytes>> {
    let Ok(location) = HeaderValue::try_from(location) else {
        return text(StatusCode::BAD_REQUEST, "Bad location");
    };
    let mut response = Response::new(Full::default());
    *response.status_mut() = StatusCode::SEE_OTHER;
    response.headers_mut().insert(header::LOCATION, location);
    response
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
