//! External generative services behind trait objects.
//!
//! All three services speak OpenAI-compatible HTTP. Each has a disabled
//! no-op variant so the engine runs fully offline; degradation is always
//! graceful (fallback text, skipped retrieval, bundled artwork).

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::EndpointConfig;

/// Generates diary bodies and chat replies from a system/user prompt pair.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> anyhow::Result<String>;
}

/// Embeds text for semantic memory retrieval. Returns `None` on failure or
/// when unconfigured; the caller stores the record unscored.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

/// Everything the image service needs to compose one diary illustration.
pub struct SceneImageRequest<'a> {
    pub pet_image: &'a str,
    pub scene_image: &'a str,
    pub pet_description: &'a str,
    pub scene_name: &'a str,
    pub partner_image: Option<&'a str>,
    pub partner_description: Option<&'a str>,
    pub diary_text: &'a str,
}

/// Produces a diary illustration URL from bundled source artwork.
#[async_trait]
pub trait Illustrator: Send + Sync {
    async fn compose_scene_image(&self, request: &SceneImageRequest<'_>) -> anyhow::Result<String>;
}

// --- Disabled variants ---

pub struct DisabledNarrator;

#[async_trait]
impl Narrator for DisabledNarrator {
    async fn generate(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
        anyhow::bail!("narrative service not configured")
    }
}

pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
}

pub struct DisabledIllustrator;

#[async_trait]
impl Illustrator for DisabledIllustrator {
    async fn compose_scene_image(
        &self,
        _request: &SceneImageRequest<'_>,
    ) -> anyhow::Result<String> {
        anyhow::bail!("image service not configured")
    }
}

// --- HTTP clients ---

pub struct HttpNarrator {
    client: reqwest::Client,
    config: EndpointConfig,
}

impl HttpNarrator {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Narrator for HttpNarrator {
    async fn generate(&self, system: &str, user: &str) -> anyhow::Result<String> {
        let url = format!("{}/chat/completions", self.config.endpoint);
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": 0.8,
        });

        let response: Value = self
            .client
            .post(&url)
            .bearer_auth(self.config.resolved_api_key())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("malformed chat completion response"))?;
        Ok(content.trim().to_string())
    }
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    config: EndpointConfig,
}

impl HttpEmbedder {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn request(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.config.endpoint);
        let body = json!({
            "model": self.config.model,
            "input": text,
        });

        let response: Value = self
            .client
            .post(&url)
            .bearer_auth(self.config.resolved_api_key())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let values = response["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("malformed embedding response"))?;
        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| anyhow::anyhow!("non-numeric embedding component"))
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.request(text).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                tracing::warn!("embedding failed, storing unscored: {e}");
                None
            }
        }
    }
}

pub struct HttpIllustrator {
    client: reqwest::Client,
    config: EndpointConfig,
}

impl HttpIllustrator {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Illustrator for HttpIllustrator {
    async fn compose_scene_image(&self, request: &SceneImageRequest<'_>) -> anyhow::Result<String> {
        let mut prompt = format!(
            "A cute storybook illustration of {} at the {}, based on: {}",
            request.pet_description, request.scene_name, request.diary_text,
        );
        if let Some(partner) = request.partner_description {
            prompt.push_str(&format!(" Together with {partner}."));
        }

        let mut sources = vec![request.pet_image, request.scene_image];
        if let Some(partner_image) = request.partner_image {
            sources.push(partner_image);
        }

        let url = format!("{}/images/generations", self.config.endpoint);
        let body = json!({
            "model": self.config.model,
            "prompt": prompt,
            "image": sources,
            "n": 1,
        });

        let response: Value = self
            .client
            .post(&url)
            .bearer_auth(self.config.resolved_api_key())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let image_url = response["data"][0]["url"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("malformed image response"))?;
        Ok(image_url.to_string())
    }
}

// --- Construction from config ---

pub fn narrator_from(config: &EndpointConfig) -> Box<dyn Narrator> {
    if config.is_configured() {
        Box::new(HttpNarrator::new(config.clone()))
    } else {
        Box::new(DisabledNarrator)
    }
}

pub fn embedder_from(config: &EndpointConfig) -> Box<dyn Embedder> {
    if config.is_configured() {
        Box::new(HttpEmbedder::new(config.clone()))
    } else {
        Box::new(DisabledEmbedder)
    }
}

pub fn illustrator_from(config: &EndpointConfig) -> Box<dyn Illustrator> {
    if config.is_configured() {
        Box::new(HttpIllustrator::new(config.clone()))
    } else {
        Box::new(DisabledIllustrator)
    }
}

#[cfg(test)]
pub mod fakes {
    use super::*;

    /// Replies with a fixed string; records nothing.
    pub struct FixedNarrator(pub &'static str);

    #[async_trait]
    impl Narrator for FixedNarrator {
        async fn generate(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    /// Always fails, like an unreachable endpoint.
    pub struct FailingNarrator;

    #[async_trait]
    impl Narrator for FailingNarrator {
        async fn generate(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            anyhow::bail!("narrator down")
        }
    }

    /// Embeds everything to the same fixed vector.
    pub struct FixedEmbedder(pub Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
            Some(self.0.clone())
        }
    }

    pub struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
            None
        }
    }

    pub struct FixedIllustrator(pub &'static str);

    #[async_trait]
    impl Illustrator for FixedIllustrator {
        async fn compose_scene_image(
            &self,
            _request: &SceneImageRequest<'_>,
        ) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }
}
