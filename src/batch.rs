use crate::api::GenerationBackend;
use crate::error::{FactoryError, Result};
use crate::generation::GenerationClient;
use crate::render::{render_row, RowOutcome};
use crate::row::RowId;
use crate::state::Dashboard;
use futures::future::join_all;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 每个已派发的行一项，按行号排序
    pub outcomes: Vec<(RowId, RowOutcome)>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.count(|o| *o == RowOutcome::Completed)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::Failed { .. }))
    }

    pub fn outcome(&self, row_id: RowId) -> Option<&RowOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == row_id)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&RowOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// 并发渲染所有三张输入图齐全且空闲的行，等待全部结束
///
/// 没有可渲染的行时返回 [`FactoryError::NoEligibleRows`]，
/// 已有批次在运行时返回 [`FactoryError::BatchAlreadyRunning`]。
pub async fn run_batch<B: GenerationBackend>(
    dashboard: &Dashboard,
    client: &GenerationClient<B>,
) -> Result<BatchReport> {
    let eligible = dashboard.eligible_rows().await;
    if eligible.is_empty() {
        warn!("Please upload all 3 images for at least one line");
        return Err(FactoryError::NoEligibleRows);
    }

    let Some(gate) = dashboard.try_begin_batch().await else {
        return Err(FactoryError::BatchAlreadyRunning);
    };

    info!(lines = ?eligible, "Starting batch render");

    let renders = eligible.iter().map(|&row_id| async move {
        let outcome = match render_row(dashboard, client, row_id).await {
            Ok(outcome) => outcome,
            Err(e) => RowOutcome::Failed {
                reason: e.to_string(),
            },
        };
        (row_id, outcome)
    });
    let outcomes = join_all(renders).await;

    dashboard.end_batch(gate).await;

    let report = BatchReport { outcomes };
    info!(
        completed = report.completed(),
        failed = report.failed(),
        "Batch render finished"
    );
    Ok(report)
}
