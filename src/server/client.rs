use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::auth::Token;
use crate::error::{ConsoleError, Result};

use super::links;
use super::types::{BuildingInfo, ConsoleChunk, JobLocator, JobStatusEntry};

/// HTTP client for a GoCD-style server's console and job status endpoints.
///
/// Every call returns a tagged `Result`; HTTP failures are classified into
/// `ConsoleError` variants the caller can match on. Nothing is retried here:
/// pollers simply try again on their next tick.
pub struct GoClient {
    client: Client,
    base_url: Url,
    token: Option<Token>,
}

impl GoClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("consolefold/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConsoleError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| ConsoleError::Config(format!("Invalid base URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Helper to build authenticated requests
    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    async fn get(&self, url: Url, what: &str) -> Result<Response> {
        debug!("GET {url}");
        let response = self.auth_request(self.client.get(url)).send().await?;
        self.check_status(response, what).await
    }

    async fn check_status(&self, response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(ConsoleError::Unauthorized {
                login_url: links::login_url(&self.base_url)?.to_string(),
            }),
            StatusCode::NOT_FOUND => Err(ConsoleError::NotFound(what.to_string())),
            status if status.is_server_error() => Err(ConsoleError::Server {
                status: status.as_u16(),
            }),
            status => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                Err(ConsoleError::Http {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Fetches console lines from `start_line` onwards.
    pub async fn fetch_console(&self, locator: &JobLocator, start_line: usize) -> Result<ConsoleChunk> {
        let url = links::console_log_url(&self.base_url, locator, start_line)?;
        let body = self
            .get(url, &format!("console log of {locator}"))
            .await?
            .text()
            .await?;

        let lines: Vec<String> = body.lines().map(str::to_string).collect();
        debug!("Received {} console lines for {locator} from line {start_line}", lines.len());

        Ok(ConsoleChunk { start_line, lines })
    }

    pub async fn fetch_job_status(&self, locator: &JobLocator) -> Result<BuildingInfo> {
        let url = links::job_status_url(&self.base_url, locator)?;
        let body = self
            .get(url, &format!("status of {locator}"))
            .await?
            .text()
            .await?;

        let entries: Vec<JobStatusEntry> =
            serde_json::from_str(&body).map_err(|e| ConsoleError::Parse(e.to_string()))?;

        entries
            .into_iter()
            .find_map(|entry| entry.building_info)
            .ok_or_else(|| {
                ConsoleError::MalformedResponse(format!("no building_info for {locator}"))
            })
    }
}
