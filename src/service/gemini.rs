//! Client for the external generative-image service. One instance is
//! built at startup and shared across requests; it keeps no per-request
//! state. Every failure path resolves to a returned image, never an error:
//! callers always get either a PNG composite or a diagnostic placeholder.

use crate::config::GeneratorConfig;
use crate::images;
use crate::images::placeholder;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::DynamicImage;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, warn};

#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Produces a PNG composite of the person wearing the product, or a
    /// placeholder image when generation fails. Infallible by contract.
    async fn generate(&self, user_jpeg: &[u8], product_jpeg: &[u8], product_name: &str) -> Vec<u8>;

    /// Live probe of the upstream service.
    async fn health_check(&self) -> bool;
}

pub struct GeminiClient {
    http: reqwest::Client,
    config: GeneratorConfig,
}

impl GeminiClient {
    pub fn new(config: GeneratorConfig) -> Self {
        if config.api_key.is_empty() {
            warn!("generator API key is not configured; try-on requests will produce placeholder images");
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .unwrap_or_default();

        Self { http, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn call(&self, payload: &Value) -> Result<Value, reqwest::Error> {
        self.http
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(payload)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }

    fn build_payload(prompt: &str, user_jpeg: &[u8], product_jpeg: &[u8]) -> Value {
        let inline = |bytes: &[u8]| {
            json!({
                "inline_data": {
                    "mime_type": "image/jpeg",
                    "data": BASE64.encode(bytes),
                }
            })
        };

        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    inline(user_jpeg),
                    inline(product_jpeg),
                ],
            }]
        })
    }

    /// Scans all response parts and decodes the first non-empty image
    /// part. Both `inlineData` and `inline_data` spellings occur in the
    /// wild; data that is not valid base64 is passed through as raw bytes.
    /// Text parts are informational only and get logged.
    fn extract_image_bytes(response: &Value) -> Option<Vec<u8>> {
        let candidates = response.get("candidates").and_then(Value::as_array)?;

        for candidate in candidates {
            let parts = candidate
                .get("content")
                .and_then(|content| content.get("parts"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    info!(text, "generation service returned a text part");
                    continue;
                }

                let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
                    continue;
                };
                let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
                if data.is_empty() {
                    continue;
                }

                let bytes = match BASE64.decode(data.as_bytes()) {
                    Ok(decoded) => decoded,
                    Err(_) => data.as_bytes().to_vec(),
                };
                return Some(bytes);
            }
        }

        None
    }

    /// Canonical output encoding is PNG regardless of what the service
    /// returned. If the extracted bytes do not decode, they are returned
    /// unmodified rather than discarded.
    fn finalize_png(bytes: Vec<u8>) -> Vec<u8> {
        match image::load_from_memory(&bytes) {
            Ok(img) => {
                let flattened = images::flatten_onto_white(&img);
                images::encode_png(&DynamicImage::ImageRgb8(flattened)).unwrap_or(bytes)
            }
            Err(e) => {
                warn!(error = %e, "returned image bytes did not decode; passing through raw");
                bytes
            }
        }
    }
}

#[async_trait::async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, user_jpeg: &[u8], product_jpeg: &[u8], product_name: &str) -> Vec<u8> {
        if self.config.api_key.is_empty() {
            return placeholder::error_image("Try-on failed: generation service credential is not configured");
        }

        let prompt = tryon_prompt(product_name);
        let payload = Self::build_payload(&prompt, user_jpeg, product_jpeg);

        match self.call(&payload).await {
            Ok(response) => match Self::extract_image_bytes(&response) {
                Some(bytes) => Self::finalize_png(bytes),
                None => {
                    warn!(product_name, "generation service returned no image part");
                    placeholder::error_image(&format!("Virtual try-on generation failed for {product_name}"))
                }
            },
            Err(e) => {
                error!(error = %e, product_name, "generation request failed");
                placeholder::error_image(&format!("Try-on failed: {e}"))
            }
        }
    }

    async fn health_check(&self) -> bool {
        if self.config.api_key.is_empty() {
            return false;
        }

        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": "Say 'API test successful'" }],
            }]
        });

        match self.call(&payload).await {
            Ok(response) => response.get("candidates").and_then(Value::as_array).map_or(false, |c| !c.is_empty()),
            Err(e) => {
                warn!(error = %e, "generation service health check failed");
                false
            }
        }
    }
}

/// Instruction set for the generative model, parameterized by the product
/// label: replace the prior garment with the exact referenced product
/// while preserving the subject and scene.
pub fn tryon_prompt(product_name: &str) -> String {
    format!(
        "You are an advanced virtual try-on AI. Create a PRECISE virtual try-on image where \
the person from the first image is wearing the EXACT {product_name} from the second image.\n\
\n\
Requirements:\n\
1. Completely remove the previous outfit and its shadows, then replace it with the \
{product_name} so it looks naturally worn.\n\
2. The {product_name} must be identical to the second image: copy the exact colors, \
patterns, textures, fabric appearance, and any logos, prints or decorative elements, \
keeping its cut and silhouette.\n\
3. Preserve the person's face, skin tone, hair, pose, body proportions, background and \
lighting exactly as in the first image.\n\
4. Show the complete person from head to toe with realistic fit, draping, wrinkles and \
folds where the fabric would naturally fall.\n\
\n\
Do NOT alter the face or body, change the background, add new objects, or change the \
lighting. The output must be a photorealistic, high-resolution, full-body image with \
sharp detail and no visible artifacts, as if the person actually owns and is wearing \
this exact {product_name}."
    )
}
