// src/classifier/ollama.rs
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::connector::{ClassifierSource, ImageClassifier};
use super::prediction::{parse_ranked, Prediction};
use crate::config::Settings;

//Classification backed by a vision model served by Ollama
pub struct OllamaClassifier {
    ollama_url: String,
    model_name: String,
    client: Client,
    prompt: String,
    top_k: usize,
}

/// Loads an [`OllamaClassifier`] after confirming the server is up and the model is pulled
pub struct OllamaSource {
    settings: Settings,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    images: Option<Vec<String>>,
    stream: bool,
    format: String,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: i64,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

fn classification_prompt(top_k: usize) -> String {
    format!(
        "Classify the main subject of this image. Respond only with JSON of the form \
         {{\"predictions\": [{{\"label\": \"<short label>\", \"confidence\": <number between 0 and 1>}}]}} \
         listing at most {} labels, most likely first.",
        top_k
    )
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch the models the Ollama server currently has available
pub fn list_models(client: &Client, ollama_url: &str) -> Result<Vec<ModelInfo>> {
    let url = format!("{}/api/tags", ollama_url);
    let response = client
        .get(&url)
        .send()
        .with_context(|| format!("Could not connect to Ollama server at {}", ollama_url))?;

    if !response.status().is_success() {
        return Err(anyhow!("Ollama server responded with status: {}", response.status()));
    }

    let tags: TagsResponse = response
        .json()
        .context("Unexpected response from Ollama /api/tags")?;
    Ok(tags.models)
}

/// Same as [`list_models`] but builds its own short-lived client
pub fn fetch_models(settings: &Settings) -> Result<Vec<ModelInfo>> {
    let client = build_client(Duration::from_secs(30))?;
    list_models(&client, &settings.ollama_url)
}

impl OllamaSource {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl ClassifierSource for OllamaSource {
    fn load(&self) -> Result<Box<dyn ImageClassifier>> {
        info!(
            "Loading Ollama model: {} at {}",
            self.settings.model_name, self.settings.ollama_url
        );

        let client = build_client(self.settings.timeout)?;
        let models = list_models(&client, &self.settings.ollama_url).map_err(|e| {
            warn!("Make sure Ollama is running: 'ollama serve'");
            e
        })?;

        if !models.iter().any(|m| m.name == self.settings.model_name) {
            return Err(anyhow!(
                "Model '{}' not found. Pull it with: ollama pull {}",
                self.settings.model_name,
                self.settings.model_name
            ));
        }

        Ok(Box::new(OllamaClassifier {
            ollama_url: self.settings.ollama_url.clone(),
            model_name: self.settings.model_name.clone(),
            client,
            prompt: classification_prompt(self.settings.top_k),
            top_k: self.settings.top_k,
        }))
    }
}

impl ImageClassifier for OllamaClassifier {
    fn classify(&self, image_data: &[u8]) -> Result<Vec<Prediction>> {
        info!("Classifying image with Ollama model: {}", self.model_name);

        let request = OllamaRequest {
            model: self.model_name.clone(),
            prompt: self.prompt.clone(),
            images: Some(vec![general_purpose::STANDARD.encode(image_data)]),
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.ollama_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Request timed out. The model might be too large or your system may need more resources.")
                } else {
                    anyhow!("Ollama API error: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let error_text = response.text()?;
            return Err(anyhow!("Ollama API error: {}", error_text));
        }

        let response_data: OllamaResponse = response
            .json()
            .context("Unexpected response from Ollama /api/generate")?;
        debug!("Raw model answer: {}", response_data.response);

        let mut predictions = parse_ranked(&response_data.response)?;
        predictions.truncate(self.top_k);
        Ok(predictions)
    }
}
