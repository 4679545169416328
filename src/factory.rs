use crate::api::GenerationBackend;
use crate::archive::{package_all_rows, package_row, Archive};
use crate::batch::{run_batch, BatchReport};
use crate::config::{AspectRatio, FactorySettings};
use crate::error::{FactoryError, Result};
use crate::generation::GenerationClient;
use crate::host::{Clipboard, FileSaver};
use crate::image::ImagePayload;
use crate::render::{render_row, RowOutcome};
use crate::row::{InputSlot, RowId};
use crate::state::{ClearAllRequest, Dashboard};
use tracing::warn;

/// 前端可调用的操作
pub struct Factory<B, S, C> {
    dashboard: Dashboard,
    client: GenerationClient<B>,
    saver: S,
    clipboard: C,
}

impl<B, S, C> Factory<B, S, C>
where
    B: GenerationBackend,
    S: FileSaver,
    C: Clipboard,
{
    pub fn new(settings: FactorySettings, backend: B, saver: S, clipboard: C) -> Self {
        Self {
            dashboard: Dashboard::new(settings),
            client: GenerationClient::new(backend),
            saver,
            clipboard,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub async fn set_style(&self, style: impl Into<String>) {
        self.dashboard.set_style(style).await
    }

    pub async fn set_aspect_ratio(&self, aspect_ratio: AspectRatio) {
        self.dashboard.set_aspect_ratio(aspect_ratio).await
    }

    /// 是否显示全部下载
    pub async fn has_any_concepts(&self) -> bool {
        self.dashboard.has_any_concepts().await
    }

    pub async fn attach_input(&self, row_id: RowId, slot: InputSlot, image: ImagePayload) -> Result<()> {
        self.dashboard.attach_input(row_id, slot, image).await
    }

    pub async fn clear_row(&self, row_id: RowId) -> Result<()> {
        self.dashboard.clear_row(row_id).await
    }

    pub async fn request_clear_all(&self) -> ClearAllRequest {
        self.dashboard.request_clear_all().await
    }

    pub async fn cancel_clear_all(&self) {
        self.dashboard.cancel_clear_all().await
    }

    pub async fn render_row(&self, row_id: RowId) -> Result<RowOutcome> {
        render_row(&self.dashboard, &self.client, row_id).await
    }

    pub async fn run_batch(&self) -> Result<BatchReport> {
        run_batch(&self.dashboard, &self.client).await
    }

    /// 打包单行并交给宿主保存，返回压缩包文件名；未就绪时返回 `None`
    pub async fn download_row(&self, row_id: RowId) -> Result<Option<String>> {
        let row = self.dashboard.row(row_id).await?;
        match package_row(&row)? {
            Some(archive) => Ok(Some(self.offer(archive).await)),
            None => Ok(None),
        }
    }

    /// 打包所有就绪的行
    pub async fn download_all(&self) -> Result<Option<String>> {
        let rows = self.dashboard.ready_rows().await;
        match package_all_rows(&rows)? {
            Some(archive) => Ok(Some(self.offer(archive).await)),
            None => Ok(None),
        }
    }

    /// 复制某行第 `scene` 个场景（从 1 开始）的提示词
    pub async fn copy_prompt(&self, row_id: RowId, scene: usize) -> Result<()> {
        let row = self.dashboard.row(row_id).await?;
        let prompt = row
            .script
            .as_ref()
            .and_then(|script| scene.checked_sub(1).and_then(|i| script.scenes.get(i)))
            .map(|s| s.prompt.clone())
            .ok_or(FactoryError::UnknownScene { row: row_id, scene })?;

        if let Err(e) = self.clipboard.copy(&prompt).await {
            warn!(row = row_id, scene, error = %e, "Clipboard copy failed");
        }
        Ok(())
    }

    async fn offer(&self, archive: Archive) -> String {
        let Archive { file_name, bytes } = archive;
        if let Err(e) = self.saver.save(&file_name, bytes).await {
            warn!(file = %file_name, error = %e, "Saving archive failed");
        }
        file_name
    }
}
