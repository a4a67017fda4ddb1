use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::Identity;

const API_ORIGIN: &str = "https://api.github.com";
const GRAPHQL_ENDPOINT: &str = "/graphql";
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed: {message} (run `gh-invoicer login` to refresh the token)")]
    Auth { message: String },
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Graph(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest {
    query: &'static str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Authenticated client for the GitHub REST and GraphQL API surfaces.
///
/// Every call attaches the bearer token; failures surface once, with the
/// server-provided message where one exists. No retries.
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
}

impl GithubClient {
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.rest(Method::GET, endpoint, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<T, ApiError> {
        self.rest(Method::POST, endpoint, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<T, ApiError> {
        self.rest(Method::PUT, endpoint, Some(body)).await
    }

    /// Fetch an absolute URL (e.g. a file download link) as plain text.
    pub async fn download_text(&self, url: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: format!("API error: {}", status.as_u16()),
            });
        }

        Ok(response.text().await?)
    }

    async fn rest<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = resolve_endpoint(endpoint);
        let mut builder = self
            .http
            .request(method, &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, ACCEPT_JSON);

        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("API error: {}", status.as_u16()));

            if status == StatusCode::UNAUTHORIZED {
                return Err(ApiError::Auth { message });
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// GraphQL calls return HTTP 200 even on failure; an `errors` array in
    /// the body is the real signal.
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        query: &'static str,
        variables: Value,
    ) -> Result<T, ApiError> {
        let request = GraphQlRequest { query, variables };
        let response = self
            .http
            .post(resolve_endpoint(GRAPHQL_ENDPOINT))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let parsed: GraphQlResponse<T> = response.json().await?;

        if let Some(errors) = parsed.errors {
            let message = errors
                .into_iter()
                .next()
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown GraphQL error".to_string());
            return Err(ApiError::Graph(message));
        }

        parsed
            .data
            .ok_or_else(|| ApiError::Graph("GraphQL response missing data".to_string()))
    }
}

/// Validate a candidate token before persisting it, returning who it
/// authenticates as.
pub async fn validate_token(token: &str) -> Result<Identity, ApiError> {
    let client = GithubClient::new(token.to_string());
    client.get("/user").await
}

fn resolve_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("{API_ORIGIN}{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_endpoints_resolve_against_api_origin() {
        assert_eq!(
            resolve_endpoint("/user"),
            "https://api.github.com/user".to_string()
        );
    }

    #[test]
    fn absolute_urls_pass_through() {
        let url = "https://raw.githubusercontent.com/a/b/main/f.yaml";
        assert_eq!(resolve_endpoint(url), url);
    }
}
