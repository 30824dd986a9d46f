//! 매장별 다음 기간 예측 미리보기.
//!
//! 한 요청 안에서 [`PreviewEngine`]은 다음 순서로 동작합니다:
//! 1. 선택된 전략이 `Batched`면 모든 행을 한 번에 모델에 넣음
//! 2. 배치 호출이 실패하면 행 단위로 다시 호출
//! 3. 모델이 구조적 에러(입력 크기 불일치, 로드 실패)를 내면 남은 요청 전체를 `Naive`로 전환
//!
//! 한 매장의 추론 실패는 그 매장만 `Skipped`가 되며 전략을 바꾸지 않습니다.

use std::collections::BTreeMap;
use std::fmt;

use sales_core::{round2, CanonicalTable, SalesRow, StoreId};
use serde::Serialize;
use tracing::{debug, warn};

use super::{
    FeaturePlan, InferenceStrategy, MlError, MlResult, NaiveReason, Regressor, NAIVE_PRIORITY,
};

/// 예측값을 만들지 못한 이유.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// 단순 전략에서 쓸 매출 컬럼 값이 없음
    NoFallbackColumn,
    /// 해당 행의 모델 추론 실패
    Inference(String),
    /// 모델 출력이 NaN/무한대
    NonFinite,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoFallbackColumn => write!(f, "no sales-like column on latest row"),
            SkipReason::Inference(msg) => write!(f, "inference failed: {}", msg),
            SkipReason::NonFinite => write!(f, "non-finite model output"),
        }
    }
}

/// 매장 하나의 미리보기 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewOutcome {
    /// 소수 둘째 자리로 반올림된 예측값
    Forecast(f64),
    /// 예측값 없음
    Skipped(SkipReason),
}

impl PreviewOutcome {
    /// 예측값 (없으면 `None`).
    pub fn value(&self) -> Option<f64> {
        match self {
            PreviewOutcome::Forecast(value) => Some(*value),
            PreviewOutcome::Skipped(_) => None,
        }
    }

    /// 예측값이 있는지 확인.
    pub fn is_forecast(&self) -> bool {
        matches!(self, PreviewOutcome::Forecast(_))
    }

    /// 메트릭 라벨.
    pub fn label(&self) -> &'static str {
        match self {
            PreviewOutcome::Forecast(_) => "forecast",
            PreviewOutcome::Skipped(SkipReason::NoFallbackColumn) => "no_fallback",
            PreviewOutcome::Skipped(SkipReason::Inference(_)) => "inference_error",
            PreviewOutcome::Skipped(SkipReason::NonFinite) => "non_finite",
        }
    }

    fn from_output(value: f64) -> Self {
        if value.is_finite() {
            PreviewOutcome::Forecast(round2(value))
        } else {
            PreviewOutcome::Skipped(SkipReason::NonFinite)
        }
    }
}

/// 요청 단위 미리보기 엔진.
///
/// 전략 전환 상태를 요청 동안 유지하므로, 여러 청크로 나눠 호출해도
/// 구조적 에러로 한 번 `Naive`로 떨어진 뒤에는 모델을 다시 부르지 않습니다.
#[derive(Debug)]
pub struct PreviewEngine<'a> {
    table: &'a CanonicalTable,
    strategy: InferenceStrategy<'a>,
}

impl<'a> PreviewEngine<'a> {
    /// 모델, 테이블, 피처 목록으로 엔진 생성.
    pub fn new<S: AsRef<str>>(
        model: &'a dyn Regressor,
        table: &'a CanonicalTable,
        features: &[S],
    ) -> Self {
        let strategy = InferenceStrategy::select(model, table, features);
        if let InferenceStrategy::Naive { reason, .. } = &strategy {
            debug!(%reason, "Preview uses naive strategy");
        }
        Self { table, strategy }
    }

    /// 현재 전략.
    pub fn strategy(&self) -> &InferenceStrategy<'a> {
        &self.strategy
    }

    /// 여러 행의 미리보기. 결과 순서는 입력 순서와 같습니다.
    ///
    /// 모델이 구조적 에러를 돌려준 경우에만 `Naive`로 전환합니다.
    /// 행 단위 실패는 행 수와 상관없이 그 행만 `Skipped`가 됩니다.
    pub fn preview(&mut self, rows: &[&SalesRow]) -> Vec<PreviewOutcome> {
        if rows.is_empty() {
            return Vec::new();
        }

        let error = match &self.strategy {
            InferenceStrategy::Naive { priority, .. } => return naive_outcomes(priority, rows),
            InferenceStrategy::Batched { model, plan } => match run_batched(*model, plan, rows) {
                Ok(outcomes) => return outcomes,
                Err(error) => error,
            },
        };

        warn!(
            rows = rows.len(),
            error = %error,
            "Model cannot serve this request, degrading to naive preview"
        );
        let priority = FeaturePlan::resolve(self.table, NAIVE_PRIORITY);
        let outcomes = naive_outcomes(&priority, rows);
        self.strategy = InferenceStrategy::Naive {
            priority,
            reason: NaiveReason::ModelUnusable {
                error: error.to_string(),
            },
        };
        outcomes
    }

    /// 행 하나의 예측. 전략 상태는 바꾸지 않습니다.
    pub fn preview_one(&self, row: &SalesRow) -> PreviewOutcome {
        match &self.strategy {
            InferenceStrategy::Naive { priority, .. } => naive_outcome(priority, row),
            InferenceStrategy::Batched { model, plan } => {
                match model.predict(&plan.matrix(&[row])) {
                    Err(error) if !error.is_recoverable() => {
                        warn!(store_id = %row.store_id, %error, "Model unusable, using naive value");
                        naive_outcome(&FeaturePlan::resolve(self.table, NAIVE_PRIORITY), row)
                    }
                    result => row_outcome(row, result),
                }
            }
        }
    }
}

fn naive_outcome(priority: &FeaturePlan, row: &SalesRow) -> PreviewOutcome {
    match priority.first_present(row) {
        Some(value) => PreviewOutcome::from_output(value),
        None => PreviewOutcome::Skipped(SkipReason::NoFallbackColumn),
    }
}

fn naive_outcomes(priority: &FeaturePlan, rows: &[&SalesRow]) -> Vec<PreviewOutcome> {
    rows.iter().map(|row| naive_outcome(priority, row)).collect()
}

fn row_outcome(row: &SalesRow, result: MlResult<Vec<f64>>) -> PreviewOutcome {
    match result {
        Ok(values) => match values.first() {
            Some(value) => PreviewOutcome::from_output(*value),
            None => PreviewOutcome::Skipped(SkipReason::Inference(
                "model returned no output".to_string(),
            )),
        },
        Err(e) => {
            warn!(store_id = %row.store_id, error = %e, "Prediction failed");
            PreviewOutcome::Skipped(SkipReason::Inference(e.to_string()))
        }
    }
}

/// 배치 호출 후 실패하면 행 단위로 재시도.
///
/// 복구 불가능한 에러(`MlError::is_recoverable`가 false)는 `Err`로 올려보냅니다.
fn run_batched(
    model: &dyn Regressor,
    plan: &FeaturePlan,
    rows: &[&SalesRow],
) -> MlResult<Vec<PreviewOutcome>> {
    let matrix = plan.matrix(rows);

    let batch_error = match model.predict(&matrix) {
        Ok(values) if values.len() == rows.len() => {
            return Ok(values.into_iter().map(PreviewOutcome::from_output).collect());
        }
        Ok(values) => MlError::Inference(format!(
            "expected {} outputs, got {}",
            rows.len(),
            values.len()
        )),
        Err(e) if !e.is_recoverable() => return Err(e),
        Err(e) => e,
    };

    if let [row] = rows {
        return Ok(vec![row_outcome(row, Err(batch_error))]);
    }

    warn!(
        rows = rows.len(),
        error = %batch_error,
        "Batch inference failed, retrying per row"
    );

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let result = match matrix.single_row(index) {
                Some(single) => model.predict(&single),
                None => Err(MlError::InvalidInput("row out of range".to_string())),
            };
            match result {
                Err(e) if !e.is_recoverable() => Err(e),
                result => Ok(row_outcome(row, result)),
            }
        })
        .collect()
}

/// 매장별 최신 행에 대한 미리보기를 한 번에 계산.
pub fn preview<S: AsRef<str>>(
    model: &dyn Regressor,
    table: &CanonicalTable,
    latest: &BTreeMap<StoreId, &SalesRow>,
    features: &[S],
) -> BTreeMap<StoreId, PreviewOutcome> {
    let mut engine = PreviewEngine::new(model, table, features);
    let rows: Vec<&SalesRow> = latest.values().copied().collect();
    latest
        .keys()
        .cloned()
        .zip(engine.preview(&rows))
        .collect()
}
