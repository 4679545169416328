use super::{GenerationBackend, ImageRequest, ScriptRequest};
use crate::config::GeminiConfig;
use crate::error::{FactoryError, Result};
use crate::image::ImagePayload;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// 第一个候选中的第一张图片
    fn image(&self) -> Option<ImagePayload> {
        self.first_parts().iter().find_map(|part| {
            part.inline_data.as_ref().map(|inline| {
                let mime = inline.mime_type.as_deref().unwrap_or("image/png");
                ImagePayload::from_base64(mime, inline.data.clone())
            })
        })
    }

    /// 第一个候选中的文本
    fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

fn inline_part(image: &ImagePayload) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type(),
            "data": image.base64_data(),
        }
    })
}

fn script_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "duration": { "type": "NUMBER" },
            "content": { "type": "STRING" },
            "scenes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "time": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "dialogue": { "type": "STRING" },
                        "veoPrompt": { "type": "STRING" }
                    },
                    "required": ["time", "description", "dialogue", "veoPrompt"]
                }
            }
        },
        "required": ["duration", "content", "scenes"]
    })
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        debug!(model = %model, "Calling generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(FactoryError::Api(format!(
                "Gemini API error (HTTP {}): {}",
                status, error_text
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate_image(&self, request: ImageRequest) -> Result<Option<ImagePayload>> {
        info!(
            inputs = request.images.len(),
            aspect_ratio = %request.aspect_ratio,
            "Generating image"
        );

        let mut parts = vec![json!({ "text": request.instruction })];
        parts.extend(request.images.iter().map(inline_part));

        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
                "imageConfig": { "aspectRatio": request.aspect_ratio.as_str() }
            }
        });

        let response = self.generate_content(&self.config.image_model, &body).await?;
        Ok(response.image())
    }

    async fn generate_script(&self, request: ScriptRequest) -> Result<String> {
        info!(inputs = request.images.len(), "Generating video script");

        let mut parts: Vec<Value> = request.images.iter().map(inline_part).collect();
        parts.push(json!({ "text": request.instruction }));

        let body = json!({
            "contents": [{ "parts": parts }],
            "systemInstruction": { "parts": [{ "text": request.system_directive }] },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": script_schema()
            }
        });

        let response = self.generate_content(&self.config.script_model, &body).await?;
        Ok(response.text().unwrap_or_else(|| {
            warn!("Script answer carried no text");
            String::new()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_inline_image() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your scene"},
                        {"inlineData": {"mimeType": "image/png", "data": "aW1n"}}
                    ]
                }
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let image = response.image().unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.decode().unwrap(), b"img");
    }

    #[test]
    fn text_only_answer_has_no_image() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "sorry"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(response.image().is_none());
        assert_eq!(response.text().as_deref(), Some("sorry"));
    }

    #[test]
    fn blocked_answer_has_neither() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(response.image().is_none());
        assert!(response.text().is_none());
    }

    fn spawn_json_server(body: &'static str) -> String {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind raw listener");
        let addr = listener.local_addr().expect("raw listener addr");

        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                // 读完整个请求再回复
                let mut request = Vec::new();
                let mut chunk = [0_u8; 4096];
                loop {
                    let n = match stream.read(&mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    request.extend_from_slice(&chunk[..n]);
                    let text = String::from_utf8_lossy(&request).to_lowercase();
                    if let Some(end) = text.find("\r\n\r\n") {
                        let length = text[..end]
                            .lines()
                            .find_map(|line| line.strip_prefix("content-length:"))
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        if request.len() >= end + 4 + length {
                            break;
                        }
                    }
                }

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> GeminiClient {
        let mut config = GeminiConfig::new("test-key");
        config.base_url = base_url;
        GeminiClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn blocked_script_answer_is_empty_text() {
        let url = spawn_json_server(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#);
        let request = ScriptRequest {
            images: vec![ImagePayload::from_bytes("image/png", b"img")],
            instruction: "write".to_string(),
            system_directive: "director".to_string(),
        };

        let text = client_for(url).generate_script(request).await.unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn blocked_script_answer_falls_back() {
        use crate::generation::GenerationClient;
        use crate::scene::VideoScript;

        let url = spawn_json_server(r#"{"candidates": [{"content": {"parts": []}}]}"#);
        let client = GenerationClient::new(client_for(url));
        let images = vec![ImagePayload::from_bytes("image/png", b"img")];

        let script = client.generate_video_flow(&images, "Cinematic Fashion").await.unwrap();
        assert_eq!(script, VideoScript::fallback());
    }

    #[test]
    fn inline_part_uses_raw_base64() {
        let image = ImagePayload::parse("data:image/webp;base64,AAAA").unwrap();
        let part = inline_part(&image);
        assert_eq!(part["inlineData"]["mimeType"], "image/webp");
        assert_eq!(part["inlineData"]["data"], "AAAA");
    }
}
