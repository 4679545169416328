use crate::config::{AspectRatio, FactorySettings};
use crate::error::{FactoryError, Result};
use crate::generation::ConceptInputs;
use crate::image::ImagePayload;
use crate::row::{ConceptArtifact, InputSlot, ProductionRow, RenderState, RowId};
use crate::scene::VideoScript;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

pub const PROGRESS_STARTED: u8 = 10;
pub const PROGRESS_CONCEPTS: u8 = 50;
pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone)]
pub struct BatchState {
    pub style: String,
    pub aspect_ratio: AspectRatio,
    pub rows: Vec<ProductionRow>,
    pub batch_running: bool,
    batch_generation: u64,
}

impl BatchState {
    fn new(settings: &FactorySettings) -> Self {
        Self {
            style: settings.style.clone(),
            aspect_ratio: settings.aspect_ratio,
            rows: (1..=settings.row_count).map(ProductionRow::new).collect(),
            batch_running: false,
            batch_generation: 0,
        }
    }

    fn row(&self, id: RowId) -> Result<&ProductionRow> {
        id.checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .ok_or(FactoryError::UnknownRow(id))
    }

    fn row_mut(&mut self, id: RowId) -> Result<&mut ProductionRow> {
        id.checked_sub(1)
            .and_then(|i| self.rows.get_mut(i))
            .ok_or(FactoryError::UnknownRow(id))
    }

    /// 凭证仍有效时返回对应的行
    fn ticket_row(&mut self, ticket: &RenderTicket) -> Option<&mut ProductionRow> {
        let row = self.row_mut(ticket.row_id).ok()?;
        if row.attempt == ticket.attempt && row.is_rendering() {
            Some(row)
        } else {
            debug!(row = ticket.row_id, "Dropping update from a stale render attempt");
            None
        }
    }
}

/// 一次渲染尝试的凭证，认领行时记录下输入和设置
#[derive(Debug, Clone)]
pub struct RenderTicket {
    pub row_id: RowId,
    attempt: u64,
    pub inputs: ConceptInputs,
    pub aspect_ratio: AspectRatio,
    pub style: String,
}

/// 批次闸门凭证，只有当前持有者能释放闸门
#[derive(Debug, PartialEq, Eq)]
pub struct BatchTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearAllRequest {
    /// 第一次按下，`expires_in` 内再按一次才会清空
    Armed { expires_in: Duration },
    Cleared,
}

/// 生产看板
///
/// 所有行的修改都经过同一把异步锁，被清空作废的渲染尝试写入会被丢弃。
pub struct Dashboard {
    state: Mutex<BatchState>,
    clear_armed_at: Mutex<Option<Instant>>,
    settings: FactorySettings,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(FactorySettings::default())
    }
}

impl Dashboard {
    pub fn new(settings: FactorySettings) -> Self {
        Self {
            state: Mutex::new(BatchState::new(&settings)),
            clear_armed_at: Mutex::new(None),
            settings,
        }
    }

    pub async fn snapshot(&self) -> BatchState {
        self.state.lock().await.clone()
    }

    pub async fn row(&self, id: RowId) -> Result<ProductionRow> {
        self.state.lock().await.row(id).cloned()
    }

    pub async fn set_style(&self, style: impl Into<String>) {
        self.state.lock().await.style = style.into();
    }

    pub async fn set_aspect_ratio(&self, aspect_ratio: AspectRatio) {
        self.state.lock().await.aspect_ratio = aspect_ratio;
    }

    pub async fn attach_input(&self, id: RowId, slot: InputSlot, image: ImagePayload) -> Result<()> {
        let mut state = self.state.lock().await;
        state.row_mut(id)?.inputs.set(slot, image);
        debug!(row = id, slot = %slot, "Attached input image");
        Ok(())
    }

    pub async fn clear_row(&self, id: RowId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.row_mut(id)?.reset();
        info!(row = id, "Cleared line");
        Ok(())
    }

    pub async fn can_render(&self, id: RowId) -> Result<bool> {
        Ok(self.state.lock().await.row(id)?.can_render())
    }

    /// 当前可以开始渲染的行号
    pub async fn eligible_rows(&self) -> Vec<RowId> {
        self.state
            .lock()
            .await
            .rows
            .iter()
            .filter(|row| row.can_render())
            .map(|row| row.id)
            .collect()
    }

    /// 检查并标记为渲染中，在同一把锁内完成
    ///
    /// 输入不全或已在渲染时返回 `None`。
    pub async fn begin_render(&self, id: RowId) -> Result<Option<RenderTicket>> {
        let mut state = self.state.lock().await;
        let aspect_ratio = state.aspect_ratio;
        let style = state.style.clone();

        let row = state.row_mut(id)?;
        let inputs = match row.inputs.to_concept_inputs() {
            Some(inputs) if !row.is_rendering() => inputs,
            _ => return Ok(None),
        };

        row.attempt += 1;
        row.state = RenderState::Rendering;
        row.progress = PROGRESS_STARTED;
        row.script = None;

        Ok(Some(RenderTicket {
            row_id: id,
            attempt: row.attempt,
            inputs,
            aspect_ratio,
            style,
        }))
    }

    pub async fn record_concepts(&self, ticket: &RenderTicket, concepts: Vec<ConceptArtifact>) -> bool {
        let mut state = self.state.lock().await;
        match state.ticket_row(ticket) {
            Some(row) => {
                row.concepts = concepts;
                row.progress = PROGRESS_CONCEPTS;
                true
            }
            None => false,
        }
    }

    pub async fn complete_render(&self, ticket: &RenderTicket, script: VideoScript) -> bool {
        let mut state = self.state.lock().await;
        match state.ticket_row(ticket) {
            Some(row) => {
                row.script = Some(script);
                row.state = RenderState::Completed;
                row.progress = PROGRESS_DONE;
                true
            }
            None => false,
        }
    }

    /// 进度归零，已生成的概念图保留
    pub async fn fail_render(&self, ticket: &RenderTicket, reason: impl Into<String>) -> bool {
        let mut state = self.state.lock().await;
        match state.ticket_row(ticket) {
            Some(row) => {
                row.state = RenderState::Failed {
                    reason: reason.into(),
                };
                row.progress = 0;
                true
            }
            None => false,
        }
    }

    /// 获取批次闸门，已被占用时返回 `None`
    pub async fn try_begin_batch(&self) -> Option<BatchTicket> {
        let mut state = self.state.lock().await;
        if state.batch_running {
            return None;
        }
        state.batch_running = true;
        state.batch_generation += 1;
        Some(BatchTicket {
            generation: state.batch_generation,
        })
    }

    /// 释放闸门；全部清空后闸门可能已属于新批次，此时不动
    pub async fn end_batch(&self, ticket: BatchTicket) {
        let mut state = self.state.lock().await;
        if state.batch_generation == ticket.generation {
            state.batch_running = false;
        } else {
            debug!("Batch gate was reset while this batch ran, leaving it alone");
        }
    }

    pub async fn is_batch_running(&self) -> bool {
        self.state.lock().await.batch_running
    }

    /// 已有三张概念图和脚本的行
    pub async fn ready_rows(&self) -> Vec<ProductionRow> {
        self.state
            .lock()
            .await
            .rows
            .iter()
            .filter(|row| row.is_ready_for_packaging())
            .cloned()
            .collect()
    }

    pub async fn has_any_concepts(&self) -> bool {
        self.state
            .lock()
            .await
            .rows
            .iter()
            .any(|row| !row.concepts.is_empty())
    }

    /// 两步清空：第一次进入确认状态，窗口内第二次才清空
    pub async fn request_clear_all(&self) -> ClearAllRequest {
        let window = self.settings.clear_confirm_window;
        let mut armed_at = self.clear_armed_at.lock().await;
        let previous = armed_at.take();

        match previous {
            Some(at) if at.elapsed() < window => {
                drop(armed_at);
                self.clear_all().await;
                ClearAllRequest::Cleared
            }
            _ => {
                *armed_at = Some(Instant::now());
                info!(window_secs = window.as_secs_f64(), "Clear all armed, press again to confirm");
                ClearAllRequest::Armed { expires_in: window }
            }
        }
    }

    pub async fn cancel_clear_all(&self) {
        *self.clear_armed_at.lock().await = None;
    }

    pub async fn is_clear_armed(&self) -> bool {
        let window = self.settings.clear_confirm_window;
        matches!(*self.clear_armed_at.lock().await, Some(at) if at.elapsed() < window)
    }

    /// 重置所有行和批次闸门，保留风格和画幅
    pub async fn clear_all(&self) {
        let mut state = self.state.lock().await;
        for row in state.rows.iter_mut() {
            row.reset();
        }
        state.batch_running = false;
        state.batch_generation += 1;
        info!("Cleared all lines");
    }
}
