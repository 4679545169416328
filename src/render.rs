use crate::api::GenerationBackend;
use crate::error::Result;
use crate::generation::GenerationClient;
use crate::row::{ConceptArtifact, RowId};
use crate::state::{Dashboard, RenderTicket};
use tracing::{error, info};

/// 单行渲染结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Completed,
    Failed { reason: String },
    /// 输入不全或已在渲染，未派发
    Skipped,
    /// 渲染过程中该行被清空
    Discarded,
}

/// 渲染一行：先生成概念图，再生成脚本
///
/// 生成错误记录到行状态中，只有行号不存在时返回 `Err`。
pub async fn render_row<B: GenerationBackend>(
    dashboard: &Dashboard,
    client: &GenerationClient<B>,
    row_id: RowId,
) -> Result<RowOutcome> {
    let Some(ticket) = dashboard.begin_render(row_id).await? else {
        info!(row = row_id, "Line is not ready to render, skipping");
        return Ok(RowOutcome::Skipped);
    };

    info!(row = row_id, "Rendering line...");
    match run_attempt(dashboard, client, &ticket).await {
        Ok(true) => {
            info!(row = row_id, "Line completed");
            Ok(RowOutcome::Completed)
        }
        Ok(false) => Ok(RowOutcome::Discarded),
        Err(e) => {
            error!(row = row_id, error = %e, "Line render failed");
            let reason = e.to_string();
            if dashboard.fail_render(&ticket, reason.clone()).await {
                Ok(RowOutcome::Failed { reason })
            } else {
                Ok(RowOutcome::Discarded)
            }
        }
    }
}

/// 尝试中途作废时返回 `Ok(false)`
async fn run_attempt<B: GenerationBackend>(
    dashboard: &Dashboard,
    client: &GenerationClient<B>,
    ticket: &RenderTicket,
) -> Result<bool> {
    // 1. 生成概念图
    let images = client
        .generate_concept_images(&ticket.inputs, ticket.aspect_ratio)
        .await?;
    let concepts = ConceptArtifact::labelled(images.clone());
    if !dashboard.record_concepts(ticket, concepts).await {
        return Ok(false);
    }
    info!(row = ticket.row_id, progress = 50, "Concept images ready");

    // 2. 生成脚本
    let script = client.generate_video_flow(&images, &ticket.style).await?;
    Ok(dashboard.complete_render(ticket, script).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockGenerationBackend;
    use crate::error::FactoryError;
    use crate::image::ImagePayload;
    use crate::row::{InputSlot, RenderState};

    fn image(tag: &str) -> ImagePayload {
        ImagePayload::from_bytes("image/png", tag.as_bytes())
    }

    async fn ready_dashboard() -> Dashboard {
        let dashboard = Dashboard::default();
        for slot in InputSlot::ALL {
            dashboard.attach_input(1, slot, image("in")).await.unwrap();
        }
        dashboard
    }

    #[tokio::test]
    async fn successful_render_completes_row() {
        let mut backend = MockGenerationBackend::new();
        backend
            .expect_generate_image()
            .times(3)
            .returning(|_| Ok(Some(image("concept"))));
        backend
            .expect_generate_script()
            .times(1)
            .returning(|_| Ok(r#"{"duration": 24, "content": "c", "scenes": []}"#.to_string()));

        let dashboard = ready_dashboard().await;
        let client = GenerationClient::new(backend);

        let outcome = render_row(&dashboard, &client, 1).await.unwrap();
        assert_eq!(outcome, RowOutcome::Completed);

        let row = dashboard.row(1).await.unwrap();
        assert_eq!(row.state, RenderState::Completed);
        assert_eq!(row.progress, 100);
        assert_eq!(row.concepts.len(), 3);
        assert_eq!(row.script.unwrap().campaign_summary, "c");
    }

    #[tokio::test]
    async fn base_image_failure_leaves_row_empty() {
        let mut backend = MockGenerationBackend::new();
        backend
            .expect_generate_image()
            .times(1)
            .returning(|_| Err(FactoryError::Api("503".to_string())));
        backend.expect_generate_script().never();

        let dashboard = ready_dashboard().await;
        let client = GenerationClient::new(backend);

        let outcome = render_row(&dashboard, &client, 1).await.unwrap();
        assert!(matches!(outcome, RowOutcome::Failed { .. }));

        let row = dashboard.row(1).await.unwrap();
        assert_eq!(row.progress, 0);
        assert!(row.concepts.is_empty());
        assert!(row.script.is_none());
        assert!(matches!(row.state, RenderState::Failed { .. }));
    }

    #[tokio::test]
    async fn script_failure_keeps_concepts() {
        let mut backend = MockGenerationBackend::new();
        backend
            .expect_generate_image()
            .times(3)
            .returning(|_| Ok(Some(image("concept"))));
        backend
            .expect_generate_script()
            .times(1)
            .returning(|_| Err(FactoryError::Api("timeout".to_string())));

        let dashboard = ready_dashboard().await;
        let client = GenerationClient::new(backend);

        render_row(&dashboard, &client, 1).await.unwrap();

        let row = dashboard.row(1).await.unwrap();
        assert_eq!(row.concepts.len(), 3);
        assert!(row.script.is_none());
        assert_eq!(row.progress, 0);
        assert!(!row.is_ready_for_packaging());
    }

    #[tokio::test]
    async fn incomplete_row_is_skipped() {
        let mut backend = MockGenerationBackend::new();
        backend.expect_generate_image().never();

        let dashboard = Dashboard::default();
        let client = GenerationClient::new(backend);

        assert_eq!(render_row(&dashboard, &client, 2).await.unwrap(), RowOutcome::Skipped);
        assert!(render_row(&dashboard, &client, 9).await.is_err());
    }
}
