use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Call body: the request id plus the phase parameters, flattened.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionCall<'a, P> {
    request_id: Uuid,
    #[serde(flatten)]
    params: &'a P,
}

#[derive(Debug, Deserialize)]
struct FunctionEnvelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Client for the hosted serverless functions. Every function takes
/// `{requestId, ...}` and answers `{success, data | error}`.
pub struct FunctionsClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl FunctionsClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(180))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        // Url::join drops the last path segment unless it ends with '/'
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| AppError::Config(format!("invalid functions_url {:?}: {}", base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub async fn invoke<P, T>(&self, function: &str, request_id: Uuid, params: &P) -> Result<T>
    where
        P: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(function)
            .map_err(|e| AppError::Config(format!("invalid function name {:?}: {}", function, e)))?;

        tracing::debug!(%request_id, function, "invoking function");

        let mut request = self
            .client
            .post(url)
            .json(&FunctionCall { request_id, params });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope = serde_json::from_str::<FunctionEnvelope<T>>(&body);

        if !status.is_success() {
            let message = envelope
                .ok()
                .and_then(|e| e.error)
                .unwrap_or_else(|| format!("HTTP {}: {}", status, body));
            return Err(function_error(function, message));
        }

        let envelope = envelope?;
        if !envelope.success {
            return Err(function_error(
                function,
                envelope
                    .error
                    .unwrap_or_else(|| "function reported failure".to_string()),
            ));
        }

        envelope
            .data
            .ok_or_else(|| function_error(function, "no data returned".to_string()))
    }
}

fn function_error(function: &str, message: String) -> AppError {
    AppError::FunctionApi {
        function: function.to_string(),
        message,
    }
}
