//! Ingredient suggestion collaborator.
//!
//! Asks Google's Gemini `generateContent` endpoint for the essential
//! ingredients of a named dish, quoted for four servings, as a JSON array of
//! `{name, quantity, unit}` objects. The response is validated strictly: any
//! entry whose unit falls outside the [`Unit`] enumeration rejects the whole
//! response. An empty array means "no suggestions" and is not an error.
//!
//! The call is the one asynchronous boundary in the system. Callers hold a
//! [`SuggestionGate`] permit for its duration so a second request cannot
//! start while one is in flight; dropping the permit (success or failure)
//! re-opens the gate so retry is always possible.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{Ingredient, Unit};

/// Environment variable for the Gemini API key.
const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default model to use.
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Base URL for the Gemini API.
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Suggestion failures, all distinguishable from the "no suggestions" empty
/// result. None of these mutate any store; the caller surfaces the message
/// and may retry.
#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("no API key available: set {GEMINI_API_KEY_ENV} or import one in a backup")]
    ApiKeyMissing,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("suggestion service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("suggestion response is not a valid ingredient list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("suggestion used an unsupported unit '{0}'")]
    InvalidUnit(String),
}

// ============================================================
// API request/response types
// ============================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

/// One entry of the model's JSON output, before unit validation.
#[derive(Debug, Deserialize)]
struct RawSuggestion {
    name: String,
    quantity: f64,
    unit: String,
}

// ============================================================
// Client
// ============================================================

/// HTTP client for the suggestion service.
#[derive(Debug, Clone)]
pub struct SuggestClient {
    api_key: Option<String>,
    client: Client,
    model: String,
}

impl SuggestClient {
    /// Create a client with an optional configured key. A missing key is not
    /// an error until a suggestion is actually requested, so the rest of the
    /// application works without one.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: Client::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a client from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Self {
        Self::new(env::var(GEMINI_API_KEY_ENV).ok())
    }

    /// Ask for the essential ingredients of `meal_name`, for four servings.
    ///
    /// `api_key_override` takes precedence over the configured key; with
    /// neither present the call fails with [`SuggestError::ApiKeyMissing`]
    /// before any request is made. An `Ok(vec![])` result means the service
    /// had nothing to suggest.
    pub async fn suggest_ingredients(
        &self,
        meal_name: &str,
        api_key_override: Option<&str>,
    ) -> Result<Vec<Ingredient>, SuggestError> {
        let api_key = api_key_override
            .or(self.api_key.as_deref())
            .ok_or(SuggestError::ApiKeyMissing)?;

        let url = format!(
            "{API_BASE_URL}/models/{}:generateContent?key={api_key}",
            self.model
        );
        let request = Self::build_request(meal_name);

        debug!(meal = meal_name, "Requesting ingredient suggestions");

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::map_api_error(status.as_u16(), &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)?;
        if let Some(error) = parsed.error {
            return Err(SuggestError::Api {
                status: status.as_u16(),
                message: error.message,
            });
        }

        let Some(text) = Self::extract_text(&parsed) else {
            debug!("Suggestion response carried no content");
            return Ok(Vec::new());
        };
        parse_suggestions(text)
    }

    fn build_request(meal_name: &str) -> GeminiRequest {
        let prompt = format!(
            "List the essential ingredients for preparing \"{meal_name}\" for 4 people, \
             with realistic quantities. Answer with a JSON array of objects, each with \
             the keys \"name\" (string), \"quantity\" (number) and \"unit\" (string). \
             The unit must be one of: 'g' (weight in grams), 'ml' (volume in milliliters) \
             or 'unit' (discrete pieces). Return only the JSON array, with no extra text \
             or code fences."
        );

        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![ContentPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: serde_json::json!({
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "name": { "type": "STRING" },
                            "quantity": { "type": "NUMBER" },
                            "unit": { "type": "STRING" }
                        },
                        "required": ["name", "quantity", "unit"]
                    }
                }),
            },
        }
    }

    fn extract_text(response: &GeminiResponse) -> Option<&str> {
        let text = response
            .candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .first()
            .map(|p| p.text.trim())?;
        (!text.is_empty()).then_some(text)
    }

    /// Map an error status to a `SuggestError`, pulling the service's own
    /// message out of the body when it is JSON.
    fn map_api_error(status: u16, body: &str) -> SuggestError {
        let message = serde_json::from_str::<GeminiResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| body.to_string(), |e| e.message);
        SuggestError::Api { status, message }
    }
}

/// Parse the model's JSON text into ingredients, enforcing the closed unit
/// set. A single out-of-set unit rejects the entire response.
fn parse_suggestions(text: &str) -> Result<Vec<Ingredient>, SuggestError> {
    let raw: Vec<RawSuggestion> = serde_json::from_str(text)?;
    let mut ingredients = Vec::with_capacity(raw.len());
    for suggestion in raw {
        let Some(unit) = Unit::from_str(&suggestion.unit) else {
            return Err(SuggestError::InvalidUnit(suggestion.unit));
        };
        ingredients.push(Ingredient {
            name: suggestion.name,
            quantity: suggestion.quantity,
            unit,
        });
    }
    Ok(ingredients)
}

// ============================================================
// In-flight gate
// ============================================================

/// Explicit idle/in-flight state for the suggestion operation. At most one
/// permit exists at a time; a second trigger while one is out is ignored by
/// the caller rather than queued.
#[derive(Debug, Default)]
pub struct SuggestionGate {
    in_flight: AtomicBool,
}

impl SuggestionGate {
    /// Take the permit if the gate is idle. `None` means a suggestion is
    /// already running.
    pub fn try_acquire(&self) -> Option<SuggestionPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .ok()
            .map(|_| SuggestionPermit { gate: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// RAII permit; dropping it re-opens the gate, on success and failure alike.
#[derive(Debug)]
pub struct SuggestionPermit<'a> {
    gate: &'a SuggestionGate,
}

impl Drop for SuggestionPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}
