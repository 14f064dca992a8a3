//! HTTP client for the job server, used by the CLI subcommands.

use serde::{Deserialize, Serialize};
use serde_json::json;

type Error = Box<dyn std::error::Error>;

/// A job as rendered by the server. The status is the server's display
/// string (e.g. "Running", "Stopped (ec: 0)").
#[derive(Debug, Serialize, Deserialize)]
pub struct JobView {
    pub id: u64,
    pub command: String,
    pub args: Vec<String>,
    pub status: String,
}

#[derive(Deserialize)]
struct StartResponse {
    id: u64,
}

#[derive(Deserialize)]
struct AllStatusResponse {
    jobs: Vec<JobView>,
}

pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new(addr: &str) -> Self {
        Self {
            base_url: addr.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// POST /start: submit a command, returning the new job's id.
    pub async fn start(&self, command: &str, args: &[String]) -> Result<u64, Error> {
        let resp = self
            .http
            .post(format!("{}/start", self.base_url))
            .json(&json!({ "command": command, "args": args }))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json::<StartResponse>().await?.id)
    }

    /// POST /stop: stop a job by id.
    pub async fn stop(&self, id: u64) -> Result<(), Error> {
        let resp = self
            .http
            .post(format!("{}/stop", self.base_url))
            .json(&json!({ "id": id }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    /// GET /status/{id}: one job's record.
    pub async fn status(&self, id: u64) -> Result<JobView, Error> {
        let resp = self
            .http
            .get(format!("{}/status/{id}", self.base_url))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// GET /status: every job's record, in submission order.
    pub async fn list(&self) -> Result<Vec<JobView>, Error> {
        let resp = self
            .http
            .get(format!("{}/status", self.base_url))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json::<AllStatusResponse>().await?.jobs)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(format!("server returned {status}: {body}").into())
}
