use super::TextGenerator;
use super::prompts::Prompt;
use crate::config::{NarrativeConfig, StoreConfig};
use crate::store::http_client::HttpClient;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

impl<'a> GenerateRequest<'a> {
    fn from_prompt(prompt: &'a Prompt) -> Self {
        let tools = if prompt.grounded {
            vec![Tool {
                google_search: serde_json::Map::new(),
            }]
        } else {
            Vec::new()
        };
        Self {
            contents: vec![Content {
                parts: vec![Part { text: &prompt.text }],
            }],
            tools,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: ReplyContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyContent {
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyPart {
    text: Option<String>,
}

/// Concatenated text of the first candidate.
fn reply_text(body: &str) -> Result<String> {
    let resp: GenerateResponse =
        serde_json::from_str(body).context("Unexpected generateContent response")?;
    let Some(candidate) = resp.candidates.into_iter().next() else {
        bail!("generateContent returned no candidates");
    };
    Ok(candidate
        .content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join(""))
}

// ── Client ────────────────────────────────────────────────────────────────────

const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` client for the hosted Gemini models. The API key goes in
/// a header so it never appears in the url.
pub struct GeminiClient {
    client: HttpClient,
    url: Url,
    api_key: HeaderValue,
}

impl GeminiClient {
    pub fn new(http: &StoreConfig, config: &NarrativeConfig, api_key: &str) -> Result<Self> {
        let base = config.endpoint.trim_end_matches('/');
        let url = Url::parse(&format!("{}/{}:generateContent", base, config.model))
            .with_context(|| format!("Invalid narrative endpoint {:?}", config.endpoint))?;
        let mut api_key = HeaderValue::from_str(api_key.trim())
            .context("narrative.api_key contains characters not allowed in a header")?;
        api_key.set_sensitive(true);
        Ok(Self {
            client: HttpClient::new(http)?,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = GenerateRequest::from_prompt(prompt);
        debug!("generateContent ({} chars, grounded: {})", prompt.text.len(), prompt.grounded);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, self.api_key.clone());
        let body = self
            .client
            .post_json_with(self.url.as_str(), headers, &request)
            .await?;
        reply_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let prompt = Prompt {
            text: "hello".into(),
            grounded: true,
        };
        let json = serde_json::to_value(GenerateRequest::from_prompt(&prompt)).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert!(json["tools"][0]["google_search"].is_object());

        let plain = Prompt {
            text: "hi".into(),
            grounded: false,
        };
        let json = serde_json::to_value(GenerateRequest::from_prompt(&plain)).unwrap();
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_reply_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Grade: "},{"text":"A"}]}}]}"#;
        assert_eq!(reply_text(body).unwrap(), "Grade: A");
        assert!(reply_text(r#"{"candidates":[]}"#).is_err());
        assert!(reply_text("not json").is_err());
    }

    #[test]
    fn test_url_carries_model_but_not_key() {
        let client = GeminiClient::new(&StoreConfig::default(), &NarrativeConfig::default(), "k3y")
            .unwrap();
        assert_eq!(
            client.url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(client.api_key.is_sensitive());
        assert!(GeminiClient::new(&StoreConfig::default(), &NarrativeConfig::default(), "bad\nkey").is_err());
    }

    #[tokio::test]
    async fn test_failed_call_does_not_leak_key() {
        let http = StoreConfig {
            max_retries: 0,
            ..Default::default()
        };
        let narrative = NarrativeConfig {
            endpoint: "http://127.0.0.1:1/v1beta/models".into(),
            ..Default::default()
        };
        let client = GeminiClient::new(&http, &narrative, "SECRET123").unwrap();
        let prompt = Prompt {
            text: "hello".into(),
            grounded: false,
        };

        let err = client.generate(&prompt).await.unwrap_err();
        let shown = format!("{:#}", err);
        assert!(shown.contains("generateContent"));
        assert!(!shown.contains("SECRET123"));
        assert!(!format!("{:?}", err).contains("SECRET123"));
    }
}
