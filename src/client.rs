//! Text generation backends.
//!
//! The suggester only needs "prompt in, text out", so the model service sits
//! behind [`TextGenerator`]. [`GeminiClient`] talks to the Gemini REST API.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

const BODY_EXCERPT_CHARS: usize = 200;
const GENERATE_METHOD: &str = "generateContent";

/// A service that turns a prompt into text.
pub trait TextGenerator {
    /// Sends `prompt` to `model` and returns the reply text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotFound`] when the service does not know `model`,
    /// and any other error for transport or service failures.
    fn generate(&self, model: &str, prompt: &str) -> Result<String>;

    /// Lists model names usable with [`TextGenerator::generate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the listing request fails.
    fn list_models(&self) -> Result<Vec<String>>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Blocking client for the Gemini `generateContent` API.
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl GeminiClient {
    /// Creates a client for `api_base` authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn model_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:{}", self.api_base, model, GENERATE_METHOD)
    }

    fn list_page(&self, page_token: Option<&str>) -> Result<ListModelsResponse> {
        let mut request = self
            .client
            .get(format!("{}/models", self.api_base))
            .header("x-goog-api-key", &self.api_key);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let resp = request.send()?;
        let status = resp.status().as_u16();
        let body = resp.text()?;
        if !(200..300).contains(&status) {
            return Err(api_error(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = self.model_url(model);
        debug!("Requesting suggestions from {}", model);

        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let status = resp.status().as_u16();
        let text = resp.text()?;
        trace!("Model replied with HTTP {} ({} bytes)", status, text.len());

        classify_response(model, status, &text)
    }

    fn list_models(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(page_token.as_deref())?;
            let (usable, next) = usable_models(page);
            names.extend(usable);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(names)
    }
}

/// Maps a `generateContent` reply to its text or a typed error.
fn classify_response(model: &str, status: u16, body: &str) -> Result<String> {
    match status {
        200..=299 => {
            let parsed: GenerateResponse = serde_json::from_str(body)?;
            Ok(extract_reply_text(&parsed))
        }
        404 => Err(Error::model_not_found(model)),
        _ => Err(api_error(status, body)),
    }
}

fn api_error(status: u16, body: &str) -> Error {
    Error::Api {
        status,
        message: truncate(body, BODY_EXCERPT_CHARS),
    }
}

/// Names of models that support `generateContent`, plus the next page token.
fn usable_models(page: ListModelsResponse) -> (Vec<String>, Option<String>) {
    let names = page
        .models
        .into_iter()
        .filter(|m| {
            m.supported_generation_methods
                .iter()
                .any(|method| method == GENERATE_METHOD)
        })
        .map(|m| match m.name.strip_prefix("models/") {
            Some(bare) => bare.to_string(),
            None => m.name,
        })
        .collect();

    let next = page.next_page_token.filter(|token| !token.is_empty());
    (names, next)
}

fn extract_reply_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
