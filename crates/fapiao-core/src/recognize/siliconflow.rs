//! SiliconFlow chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::remote::{
    fields_from_content, text_prompt, RemoteExtractor, IMAGE_INSTRUCTION, TEXT_SYSTEM_PROMPT,
};
use crate::error::RemoteError;
use crate::media::ImageSource;
use crate::models::config::RemoteConfig;
use crate::models::fields::ExtractedFields;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Content<'a> {
    Text(String),
    Parts(Vec<Part<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Part<'a> {
    ImageUrl { image_url: ImageUrl<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the text and vision models behind one chat-completions URL.
pub struct SiliconFlowClient {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl SiliconFlowClient {
    /// Build a client, or `None` when no API key is configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, RemoteError> {
        if !config.is_configured() {
            debug!("Remote recognition disabled: no API key");
            return Ok(None);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Some(Self {
            client: builder.build()?,
            config: config.clone(),
        }))
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ExtractedFields, RemoteError> {
        info!("Calling remote model {} at {}", request.model, self.config.api_url);
        let resp = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Remote model returned HTTP {}", status.as_u16());
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = resp.json().await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        let fields = fields_from_content(&content)?;
        debug!("Remote model answered with number '{}'", fields.invoice_number);
        Ok(fields)
    }
}

#[async_trait]
impl RemoteExtractor for SiliconFlowClient {
    async fn extract_text(&self, text: &str) -> Result<ExtractedFields, RemoteError> {
        let request = ChatRequest {
            model: &self.config.text_model,
            messages: vec![
                Message {
                    role: "system",
                    content: Content::Text(TEXT_SYSTEM_PROMPT.to_string()),
                },
                Message {
                    role: "user",
                    content: Content::Text(text_prompt(text, self.config.max_text_chars)),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.text_max_tokens,
        };
        self.complete(&request).await
    }

    async fn extract_image(&self, image: &ImageSource) -> Result<ExtractedFields, RemoteError> {
        let request = ChatRequest {
            model: &self.config.vision_model,
            messages: vec![Message {
                role: "user",
                content: Content::Parts(vec![
                    Part::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                        },
                    },
                    Part::Text {
                        text: IMAGE_INSTRUCTION,
                    },
                ]),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.vision_max_tokens,
        };
        self.complete(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unconfigured_client_is_none() {
        let client = SiliconFlowClient::from_config(&RemoteConfig::default()).unwrap();
        assert!(client.is_none());
    }

    #[test]
    fn test_image_request_shape() {
        let request = ChatRequest {
            model: "deepseek-ai/DeepSeek-OCR",
            messages: vec![Message {
                role: "user",
                content: Content::Parts(vec![
                    Part::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/png;base64,AAAA",
                        },
                    },
                    Part::Text {
                        text: IMAGE_INSTRUCTION,
                    },
                ]),
            }],
            temperature: 0.1,
            max_tokens: 1000,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["messages"][0]["content"][0],
            json!({"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}})
        );
        assert_eq!(value["messages"][0]["content"][1]["type"], "text");
        assert_eq!(value["max_tokens"], 1000);
    }

    #[test]
    fn test_response_without_content_deserializes() {
        let response: ChatResponse =
            serde_json::from_value(json!({"choices": [{"message": {"role": "assistant"}}]}))
                .unwrap();
        assert!(response.choices[0].message.content.is_none());
    }
}
