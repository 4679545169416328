use crate::api::{GenerationBackend, ImageRequest, ScriptRequest};
use crate::config::AspectRatio;
use crate::error::{FactoryError, Result};
use crate::image::ImagePayload;
use crate::scene::{VideoScript, SCENE_COUNT};
use tracing::{info, warn};

const SCRIPT_DIRECTIVE: &str = "You are an expert creative director for short video ads. Return ONLY a JSON object. For 'veoPrompt', write a cinematic, detailed English prompt focusing on camera movement and model action. For 'dialogue', write natural Vietnamese. Ensure NO loop or repetition.";

const HOLD_POSE: &str = "Same scene. The girl's hand is now gracefully grasping the handle of the handbag. Maintain consistent lighting and model features.";

const WEAR_POSE: &str = "Same girl and bag. The girl is now wearing the handbag on her shoulder, posing for high-fashion commercial. Background is the same desk/room.";

fn composite_instruction(aspect_ratio: AspectRatio) -> String {
    format!(
        "Luxury commercial photography. Composite the gift box and the handbag from the provided images into the background scene. Add a girl's hand resting on the table. Professional lighting, 8k resolution. Aspect ratio: {}.",
        aspect_ratio
    )
}

fn script_instruction(style: &str) -> String {
    format!(
        "Based on these 3 images, create a professional 24-second video script (3 scenes x 8s). Style: {}. For each scene, provide a descriptive technical prompt for the Veo 3 video model.",
        style
    )
}

/// 一行的三张输入图
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptInputs {
    pub background: ImagePayload,
    pub product_box: ImagePayload,
    pub product: ImagePayload,
}

/// 去掉包裹的 ```json 代码块标记
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// 解析脚本 JSON，失败时使用备用脚本
pub fn parse_script(raw: &str) -> VideoScript {
    match serde_json::from_str::<VideoScript>(strip_code_fence(raw)) {
        Ok(script) => {
            if script.scenes.len() != SCENE_COUNT {
                warn!(scenes = script.scenes.len(), "Script scene count differs from 3");
            }
            script
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse script JSON, using fallback script");
            VideoScript::fallback()
        }
    }
}

pub struct GenerationClient<B> {
    backend: B,
}

impl<B: GenerationBackend> GenerationClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 依次生成基础合成图和两张姿势变体
    ///
    /// 只有基础图失败是致命的，变体没有返回图片时复用基础图。
    pub async fn generate_concept_images(
        &self,
        inputs: &ConceptInputs,
        aspect_ratio: AspectRatio,
    ) -> Result<[ImagePayload; SCENE_COUNT]> {
        info!("Generating base concept image...");
        let base = self
            .backend
            .generate_image(ImageRequest {
                instruction: composite_instruction(aspect_ratio),
                images: vec![
                    inputs.background.clone(),
                    inputs.product_box.clone(),
                    inputs.product.clone(),
                ],
                aspect_ratio,
            })
            .await?
            .ok_or(FactoryError::MissingBaseImage)?;

        let holding = self.generate_variant(&base, HOLD_POSE, aspect_ratio).await?;
        let wearing = self.generate_variant(&base, WEAR_POSE, aspect_ratio).await?;

        Ok([base, holding, wearing])
    }

    async fn generate_variant(
        &self,
        base: &ImagePayload,
        instruction: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload> {
        let variant = self
            .backend
            .generate_image(ImageRequest {
                instruction: instruction.to_string(),
                images: vec![base.clone()],
                aspect_ratio,
            })
            .await?;

        Ok(variant.unwrap_or_else(|| {
            warn!("Pose variant returned no image, reusing base image");
            base.clone()
        }))
    }

    /// 生成三个场景的视频脚本
    pub async fn generate_video_flow(
        &self,
        images: &[ImagePayload],
        style: &str,
    ) -> Result<VideoScript> {
        info!(style = %style, "Generating video flow...");
        let raw = self
            .backend
            .generate_script(ScriptRequest {
                images: images.to_vec(),
                instruction: script_instruction(style),
                system_directive: SCRIPT_DIRECTIVE.to_string(),
            })
            .await?;

        Ok(parse_script(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockGenerationBackend;
    use mockall::Sequence;

    fn payload(tag: &str) -> ImagePayload {
        ImagePayload::from_bytes("image/png", tag.as_bytes())
    }

    fn inputs() -> ConceptInputs {
        ConceptInputs {
            background: payload("bg"),
            product_box: payload("box"),
            product: payload("bag"),
        }
    }

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {} "), "{}");
    }

    #[test]
    fn unparseable_script_falls_back() {
        assert_eq!(parse_script("not json at all"), VideoScript::fallback());
        assert_eq!(parse_script(r#"{"duration": "long"}"#), VideoScript::fallback());
        assert_eq!(parse_script(""), VideoScript::fallback());
    }

    #[test]
    fn fenced_script_is_parsed() {
        let raw = "```json\n{\"duration\": 24, \"content\": \"c\", \"scenes\": []}\n```";
        let script = parse_script(raw);
        assert_eq!(script.campaign_summary, "c");
        assert!(script.scenes.is_empty());
    }

    #[tokio::test]
    async fn concept_chain_runs_in_order() {
        let mut backend = MockGenerationBackend::new();
        let mut seq = Sequence::new();

        backend
            .expect_generate_image()
            .withf(|req| req.images.len() == 3 && req.instruction.contains("Aspect ratio: 1:1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(payload("base"))));
        backend
            .expect_generate_image()
            .withf(|req| req.images == vec![payload("base")] && req.instruction == HOLD_POSE)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(payload("hold"))));
        backend
            .expect_generate_image()
            .withf(|req| req.images == vec![payload("base")] && req.instruction == WEAR_POSE)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(payload("wear"))));

        let client = GenerationClient::new(backend);
        let images = client
            .generate_concept_images(&inputs(), AspectRatio::Square)
            .await
            .unwrap();

        assert_eq!(images, [payload("base"), payload("hold"), payload("wear")]);
    }

    #[tokio::test]
    async fn missing_variants_reuse_base() {
        let mut backend = MockGenerationBackend::new();
        let mut seq = Sequence::new();

        backend
            .expect_generate_image()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(payload("base"))));
        backend
            .expect_generate_image()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));

        let client = GenerationClient::new(backend);
        let images = client
            .generate_concept_images(&inputs(), AspectRatio::default())
            .await
            .unwrap();

        assert_eq!(images, [payload("base"), payload("base"), payload("base")]);
    }

    #[tokio::test]
    async fn missing_base_image_is_fatal() {
        let mut backend = MockGenerationBackend::new();
        backend
            .expect_generate_image()
            .times(1)
            .returning(|_| Ok(None));

        let client = GenerationClient::new(backend);
        let err = client
            .generate_concept_images(&inputs(), AspectRatio::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FactoryError::MissingBaseImage));
    }

    #[tokio::test]
    async fn script_backend_error_propagates() {
        let mut backend = MockGenerationBackend::new();
        backend
            .expect_generate_script()
            .times(1)
            .returning(|_| Err(FactoryError::Api("quota exceeded".to_string())));

        let client = GenerationClient::new(backend);
        let result = client.generate_video_flow(&[payload("a")], "Cinematic Fashion").await;

        assert!(matches!(result, Err(FactoryError::Api(_))));
    }

    #[tokio::test]
    async fn script_request_carries_style_and_images() {
        let mut backend = MockGenerationBackend::new();
        backend
            .expect_generate_script()
            .withf(|req| {
                req.images.len() == 3
                    && req.instruction.contains("Style: Street Style Reel")
                    && req.system_directive == SCRIPT_DIRECTIVE
            })
            .times(1)
            .returning(|_| Ok("garbage".to_string()));

        let client = GenerationClient::new(backend);
        let images = [payload("1"), payload("2"), payload("3")];
        let script = client
            .generate_video_flow(&images, "Street Style Reel")
            .await
            .unwrap();

        assert_eq!(script, VideoScript::fallback());
    }
}
