//! Wolfram|Alpha full-results API as the calculation backend

use crate::{Calculator, DispatchError, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_WOLFRAM_URL: &str = "https://api.wolframalpha.com/v2/query";

pub struct WolframAlpha {
    client: reqwest::blocking::Client,
    app_id: String,
    url: String,
}

impl WolframAlpha {
    pub fn new(app_id: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DispatchError::Network(e.to_string()))?;
        Ok(Self {
            client,
            app_id: app_id.into(),
            url: DEFAULT_WOLFRAM_URL.to_string(),
        })
    }

    /// Reads the app id from `WOLFRAM_APP_ID`.
    pub fn from_env() -> Result<Self> {
        let app_id = std::env::var("WOLFRAM_APP_ID")
            .map_err(|_| DispatchError::Network("WOLFRAM_APP_ID not set".into()))?;
        Self::new(app_id)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl Calculator for WolframAlpha {
    fn query(&mut self, input: &str) -> Result<Option<String>> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        debug!(%input, "querying wolfram alpha");
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("appid", self.app_id.as_str()),
                ("input", input),
                ("output", "json"),
                ("format", "plaintext"),
            ])
            .send()
            .map_err(|e| DispatchError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            warn!(%status, "wolfram alpha request failed");
            return Err(DispatchError::Network(format!("wolfram alpha returned {status}")));
        }
        let body: Value = resp
            .json()
            .map_err(|e| DispatchError::Network(e.to_string()))?;
        Ok(primary_result(&body))
    }
}

/// Plaintext of the first subpod of the primary result pod.
pub(crate) fn primary_result(body: &Value) -> Option<String> {
    let result = body.get("queryresult")?;
    if result.get("success").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    result
        .get("pods")?
        .as_array()?
        .iter()
        .find(|pod| pod.get("primary").and_then(Value::as_bool) == Some(true))?
        .get("subpods")?
        .as_array()?
        .first()?
        .get("plaintext")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
