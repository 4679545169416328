use serde::{Deserialize, Serialize};

/// 每条生产线的场景数，也是概念图数量
pub const SCENE_COUNT: usize = 3;

/// 24 秒视频脚本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoScript {
    /// 总时长（秒）
    #[serde(rename = "duration")]
    pub total_duration_seconds: f64,
    /// 整体创意
    #[serde(rename = "content", alias = "summary")]
    pub campaign_summary: String,
    pub scenes: Vec<ScriptScene>,
}

/// 一个分镜
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptScene {
    /// 时间段，例如 "0-8s"
    pub time: String,
    pub description: String,
    /// 旁白台词
    pub dialogue: String,
    /// 给视频模型的提示词
    #[serde(rename = "veoPrompt", alias = "prompt")]
    pub prompt: String,
}

impl ScriptScene {
    pub fn new(
        time: impl Into<String>,
        description: impl Into<String>,
        dialogue: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            description: description.into(),
            dialogue: dialogue.into(),
            prompt: prompt.into(),
        }
    }
}

impl VideoScript {
    /// 无法解析返回内容时使用的备用脚本
    pub fn fallback() -> Self {
        Self {
            total_duration_seconds: 24.0,
            campaign_summary: "Quảng cáo sản phẩm thời trang cao cấp".to_string(),
            scenes: vec![
                ScriptScene::new(
                    "0-8s",
                    "Mở hộp và giới thiệu sản phẩm",
                    "Chào mọi người, hôm nay mình sẽ unbox chiếc túi siêu xinh này nhé!",
                    "Close-up cinematic shot of a luxury gift box opening on a desk, soft studio lighting, revealing a stylish blue leather handbag, 4k, realistic.",
                ),
                ScriptScene::new(
                    "8-16s",
                    "Chi tiết sản phẩm và tương tác",
                    "Chất liệu da cực kỳ cao cấp, cầm rất chắc tay luôn.",
                    "A girl's hand gracefully touching and lifting a blue handbag, macro shot of the texture and gold zipper, elegant camera slide, bokeh background.",
                ),
                ScriptScene::new(
                    "16-24s",
                    "Model phối đồ cùng túi",
                    "Phối với đồ nào cũng hợp, cực kỳ sang chảnh nhé.",
                    "Fashion model wearing a blue handbag over her shoulder, walking confidently in a modern interior, cinematic tracking shot, high-end fashion commercial style.",
                ),
            ],
        }
    }

    /// 写入压缩包的提示词文本，每个场景一段
    ///
    /// 单行包和总包都使用这一种格式，标题统一为 `--- SCENE {time} ---`。
    pub fn prompt_sheet(&self) -> String {
        self.scenes
            .iter()
            .map(|scene| {
                format!(
                    "--- SCENE {} ---\nPROMPT: {}\nVOICE: {}",
                    scene.time, scene.prompt, scene.dialogue
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
