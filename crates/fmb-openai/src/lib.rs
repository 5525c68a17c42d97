//! OpenAI adapter (feedback classification).
//!
//! One chat-completions request per feedback event: the fixed judgment rubric
//! as the system instruction, the customer text plus up to 3 image blocks as
//! the user content, asking for a short low-temperature structured answer.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tracing::{debug, warn};

use fmb_core::{
    errors::Error,
    ports::{ClassifierPort, ClassifyRequest},
    rubric::{JUDGMENT_PROMPT, NO_TEXT_PLACEHOLDER},
    verdict::{parse_verdict, Verdict},
    Result,
};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone, Debug)]
pub struct OpenAiClassifier {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiClassifier {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client build");
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http,
        }
    }

    async fn request_completion(&self, req: &ClassifyRequest) -> Result<String> {
        // Fetch + inline each image; a failed fetch skips that attachment and
        // is never fatal to the classification.
        let mut image_data_urls = Vec::new();
        for url in &req.image_urls {
            match fetch_image_data_url(&self.http, url).await {
                Some(data_url) => image_data_urls.push(data_url),
                None => debug!(url, "skipping unfetchable attachment"),
            }
        }

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": JUDGMENT_PROMPT},
                {"role": "user", "content": build_user_content(&req.text, &image_data_urls)},
            ],
            "max_tokens": 500,
            "temperature": 0.3,
        });

        let resp = self
            .http
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Classifier(format!("openai request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Classifier(format!(
                "openai completion failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| Error::Classifier(format!("openai json error: {e}")))?;

        let text = v
            .pointer("/choices/0/message/content")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(Error::Classifier(
                "openai completion returned empty content".to_string(),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl ClassifierPort for OpenAiClassifier {
    async fn classify(&self, req: ClassifyRequest) -> Verdict {
        match self.request_completion(&req).await {
            Ok(raw) => parse_verdict(&raw),
            Err(e) => {
                // Fail open: infrastructure failures never trigger punishment.
                warn!(error = %e, "classification call failed, failing open");
                Verdict::fail_open(format!("Erro na análise: {e}"))
            }
        }
    }
}

/// Media Fetcher: download attachment bytes and encode them as a
/// `data:` URL for the multimodal request. Any failure yields `None` and the
/// caller skips the attachment; there is no retry.
pub async fn fetch_image_data_url(http: &reqwest::Client, url: &str) -> Option<String> {
    let resp = match http.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(url, error = %e, "image download failed");
            return None;
        }
    };

    if !resp.status().is_success() {
        warn!(url, status = %resp.status(), "image download returned non-success");
        return None;
    }

    let mime = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| mime_from_url(url).to_string());

    let bytes = resp.bytes().await.ok()?;
    Some(format!("data:{mime};base64,{}", BASE64.encode(&bytes)))
}

fn mime_from_url(url: &str) -> &'static str {
    let path = url.split('?').next().unwrap_or(url).to_lowercase();
    if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "image/jpeg"
    } else if path.ends_with(".gif") {
        "image/gif"
    } else if path.ends_with(".webp") {
        "image/webp"
    } else {
        "image/png"
    }
}

/// The structured user content: one text block (with an explicit placeholder
/// when the customer sent only images) followed by the image blocks.
fn build_user_content(text: &str, image_data_urls: &[String]) -> Value {
    let feedback_text = if text.trim().is_empty() {
        format!("FEEDBACK DO CLIENTE:\n{NO_TEXT_PLACEHOLDER}")
    } else {
        format!("FEEDBACK DO CLIENTE:\n{text}")
    };

    let mut content = vec![json!({"type": "text", "text": feedback_text})];
    for data_url in image_data_urls {
        content.push(json!({
            "type": "image_url",
            "image_url": {"url": data_url, "detail": "high"},
        }));
    }

    Value::Array(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_content_uses_placeholder_for_image_only_feedback() {
        let content = build_user_content("  ", &["data:image/png;base64,AAAA".to_string()]);
        let blocks = content.as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0]["text"].as_str().unwrap(),
            "FEEDBACK DO CLIENTE:\n(Sem texto - apenas imagem)"
        );
        assert_eq!(blocks[1]["type"].as_str().unwrap(), "image_url");
        assert_eq!(blocks[1]["image_url"]["detail"].as_str().unwrap(), "high");
    }

    #[test]
    fn user_content_keeps_customer_text_verbatim() {
        let content = build_user_content("O bot parou de funcionar pra mim.", &[]);
        let blocks = content.as_array().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0]["text"].as_str().unwrap(),
            "FEEDBACK DO CLIENTE:\nO bot parou de funcionar pra mim."
        );
    }

    #[test]
    fn mime_guess_from_extension() {
        assert_eq!(mime_from_url("https://cdn.example/a.JPG?ex=1"), "image/jpeg");
        assert_eq!(mime_from_url("https://cdn.example/a.webp"), "image/webp");
        assert_eq!(mime_from_url("https://cdn.example/mystery"), "image/png");
    }
}
