// src/llm/client.rs

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::config::{LlmSettings, Provider};
use crate::error::{Error, Result};
use crate::llm::backend::TextGenerator;
use crate::llm::prompt::LlmPrompt;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

pub struct LlmClient {
    cfg: LlmSettings,
    http: reqwest::blocking::Client,
}

impl LlmClient {
    pub fn new(cfg: LlmSettings) -> Result<Self> {
        if cfg.api_key.trim().is_empty() {
            return Err(Error::Authentication(
                "API key missing; set API_KEY or add api_key to the config file".into(),
            ));
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { cfg, http })
    }

    /// Execute LLM request
    pub fn run(&self, prompt: &LlmPrompt) -> Result<String> {
        let (url, headers, body) = build_request(&self.cfg, prompt);

        log::debug!(
            "POST {} model={} prompt={}",
            url,
            self.cfg.model,
            &prompt.hash()[..12]
        );

        let mut req = self.http.post(&url).json(&body);
        for (k, v) in headers {
            req = req.header(k, v);
        }

        let resp = req.send().map_err(transport_error)?;
        let status = resp.status();
        let raw = resp.text().map_err(transport_error)?;

        check_status(status, &raw)?;

        let json: Value = serde_json::from_str(&raw).map_err(|e| Error::Provider {
            status: status.as_u16(),
            body: format!("response is not JSON: {e}"),
        })?;

        extract_text(self.cfg.provider, &json).ok_or_else(|| Error::Provider {
            status: status.as_u16(),
            body: format!("{:?} response parse failure", self.cfg.provider),
        })
    }
}

impl TextGenerator for LlmClient {
    fn generate(&self, prompt: &LlmPrompt) -> Result<String> {
        self.run(prompt)
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Network(format!("request timed out: {e}"))
    } else {
        Error::Network(e.to_string())
    }
}

fn check_status(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    let body = body.trim().to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Authentication(format!(
            "provider rejected the API key ({status}): {body}"
        ))),
        StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimit(body)),
        _ => Err(Error::Provider {
            status: status.as_u16(),
            body,
        }),
    }
}

fn build_request(
    cfg: &LlmSettings,
    prompt: &LlmPrompt,
) -> (String, Vec<(&'static str, String)>, Value) {
    match cfg.provider {
        Provider::OpenAI => {
            let base = cfg
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.into());
            let url = format!("{}/chat/completions", base.trim_end_matches('/'));

            let body = serde_json::json!({
                "model": cfg.model,
                "messages": [
                    { "role": "system", "content": prompt.system },
                    { "role": "user", "content": prompt.user }
                ],
                "temperature": cfg.temperature,
                "max_tokens": cfg.max_tokens,
            });

            (
                url,
                vec![("Authorization", format!("Bearer {}", cfg.api_key))],
                body,
            )
        }

        Provider::Anthropic => {
            let base = cfg
                .base_url
                .clone()
                .unwrap_or_else(|| ANTHROPIC_BASE_URL.into());
            let url = format!("{}/messages", base.trim_end_matches('/'));

            let body = serde_json::json!({
                "model": cfg.model,
                "max_tokens": cfg.max_tokens,
                "temperature": cfg.temperature,
                "system": prompt.system,
                "messages": [
                    { "role": "user", "content": prompt.user }
                ]
            });

            (
                url,
                vec![
                    ("x-api-key", cfg.api_key.clone()),
                    ("anthropic-version", "2023-06-01".into()),
                ],
                body,
            )
        }
    }
}

fn extract_text(provider: Provider, v: &Value) -> Option<String> {
    let text = match provider {
        Provider::OpenAI => v.pointer("/choices/0/message/content"),
        Provider::Anthropic => v.pointer("/content/0/text"),
    };
    text.and_then(Value::as_str).map(str::to_owned)
}
