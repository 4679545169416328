use crate::error::{FactoryError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_SCRIPT_MODEL: &str = "gemini-3-flash-preview";

/// 预设风格，也可以使用其他任意字符串
pub const STYLE_PRESETS: &[&str] = &[
    "Unbox Đồ, Show Dáng",
    "Hôm Nay Mặc Gì?",
    "Cinematic Fashion",
    "Street Style Reel",
    "Cinematic Commercial",
    "Review Sản Phẩm",
];

/// Gemini API 连接配置
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub image_model: String,
    pub script_model: String,
    /// 每个请求的超时
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            script_model: DEFAULT_SCRIPT_MODEL.to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }

    /// 从环境变量加载配置（先读取 `.env`）
    ///
    /// 优先级：`api_key` > `GEMINI_API_KEY` > `API_KEY`。
    pub fn from_env(api_key: Option<String>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = api_key
            .or_else(|| env::var("GEMINI_API_KEY").ok())
            .or_else(|| env::var("API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                FactoryError::Config(
                    "GEMINI_API_KEY not found. Set it via --api-key or the GEMINI_API_KEY environment variable".to_string(),
                )
            })?;

        let mut config = Self::new(api_key);
        if let Ok(url) = env::var("GEMINI_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(model) = env::var("VEO_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Ok(model) = env::var("VEO_SCRIPT_MODEL") {
            config.script_model = model;
        }
        if let Ok(secs) = env::var("VEO_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                FactoryError::Config(format!("VEO_REQUEST_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// 图片画幅
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Portrait9x16,
        AspectRatio::Portrait3x4,
        AspectRatio::Square,
        AspectRatio::Landscape4x3,
        AspectRatio::Landscape16x9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Landscape16x9 => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = FactoryError;

    fn from_str(s: &str) -> Result<Self> {
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s.trim())
            .ok_or_else(|| FactoryError::Config(format!("unsupported aspect ratio: {}", s)))
    }
}

/// 看板初始设置
#[derive(Clone, Debug)]
pub struct FactorySettings {
    pub style: String,
    pub aspect_ratio: AspectRatio,
    pub row_count: usize,
    /// 全部清空的确认窗口
    pub clear_confirm_window: Duration,
}

impl Default for FactorySettings {
    fn default() -> Self {
        Self {
            style: STYLE_PRESETS[0].to_string(),
            aspect_ratio: AspectRatio::default(),
            row_count: 5,
            clear_confirm_window: Duration::from_secs(4),
        }
    }
}
