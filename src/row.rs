use crate::error::FactoryError;
use crate::generation::ConceptInputs;
use crate::image::ImagePayload;
use crate::scene::{VideoScript, SCENE_COUNT};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// 行号，从 1 开始
pub type RowId = usize;

/// 输入图片槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputSlot {
    Background,
    Box,
    Product,
}

impl InputSlot {
    pub const ALL: [InputSlot; 3] = [InputSlot::Background, InputSlot::Box, InputSlot::Product];
}

impl fmt::Display for InputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputSlot::Background => "background",
            InputSlot::Box => "box",
            InputSlot::Product => "product",
        };
        f.write_str(name)
    }
}

impl FromStr for InputSlot {
    type Err = FactoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "background" | "bg" => Ok(InputSlot::Background),
            "box" => Ok(InputSlot::Box),
            "product" | "bag" => Ok(InputSlot::Product),
            other => Err(FactoryError::Config(format!("unknown input slot: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowInputs {
    pub background: Option<ImagePayload>,
    pub product_box: Option<ImagePayload>,
    pub product: Option<ImagePayload>,
}

impl RowInputs {
    pub fn set(&mut self, slot: InputSlot, image: ImagePayload) {
        match slot {
            InputSlot::Background => self.background = Some(image),
            InputSlot::Box => self.product_box = Some(image),
            InputSlot::Product => self.product = Some(image),
        }
    }

    pub fn get(&self, slot: InputSlot) -> Option<&ImagePayload> {
        match slot {
            InputSlot::Background => self.background.as_ref(),
            InputSlot::Box => self.product_box.as_ref(),
            InputSlot::Product => self.product.as_ref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        InputSlot::ALL.iter().all(|slot| self.get(*slot).is_some())
    }

    /// 三张图都齐时返回，否则为 `None`
    pub fn to_concept_inputs(&self) -> Option<ConceptInputs> {
        Some(ConceptInputs {
            background: self.background.clone()?,
            product_box: self.product_box.clone()?,
            product: self.product.clone()?,
        })
    }
}

/// 生成的概念图及其标签
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptArtifact {
    pub label: String,
    pub image: ImagePayload,
}

impl ConceptArtifact {
    /// 按顺序标记为 `IMAGE 1..=3`
    pub fn labelled(images: [ImagePayload; SCENE_COUNT]) -> Vec<ConceptArtifact> {
        images
            .into_iter()
            .enumerate()
            .map(|(i, image)| ConceptArtifact {
                label: format!("IMAGE {}", i + 1),
                image,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RenderState {
    #[default]
    Idle,
    Rendering,
    Completed,
    Failed {
        reason: String,
    },
}

/// 一条生产线
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionRow {
    pub id: RowId,
    pub inputs: RowInputs,
    pub concepts: Vec<ConceptArtifact>,
    pub script: Option<VideoScript>,
    pub state: RenderState,
    /// 0..=100
    pub progress: u8,
    #[serde(skip)]
    pub(crate) attempt: u64,
}

impl ProductionRow {
    pub fn new(id: RowId) -> Self {
        Self {
            id,
            inputs: RowInputs::default(),
            concepts: Vec::new(),
            script: None,
            state: RenderState::Idle,
            progress: 0,
            attempt: 0,
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.state == RenderState::Rendering
    }

    pub fn can_render(&self) -> bool {
        self.inputs.is_complete() && !self.is_rendering()
    }

    pub fn is_ready_for_packaging(&self) -> bool {
        self.concepts.len() == SCENE_COUNT && self.script.is_some()
    }

    /// 恢复为空行，正在进行的渲染尝试作废
    pub(crate) fn reset(&mut self) {
        let attempt = self.attempt + 1;
        *self = Self::new(self.id);
        self.attempt = attempt;
    }
}
