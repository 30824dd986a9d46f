//! 요청 단위 추론 전략 선택.

use std::fmt;

use sales_core::CanonicalTable;
use serde::Serialize;
use tracing::debug;

use super::{FeaturePlan, Regressor};

/// 모델을 쓸 수 없을 때 값으로 사용할 매출 계열 컬럼 (우선순위 순).
pub const NAIVE_PRIORITY: &[&str] = &["total_sales", "sales", "revenue", "amount", "value", "y"];

/// 단순(naïve) 전략으로 떨어진 이유.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NaiveReason {
    /// 피처 목록이 비어있음
    EmptyFeatureList,
    /// 피처 목록의 어떤 컬럼도 테이블에 없음
    NoFeatureResolved,
    /// 모델 입력 크기와 피처 수가 다름
    InputSizeMismatch { expected: usize, actual: usize },
    /// 모델이 구조적 에러(입력 크기 불일치, 로드 실패)를 반환함
    ModelUnusable { error: String },
}

impl fmt::Display for NaiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaiveReason::EmptyFeatureList => write!(f, "empty feature list"),
            NaiveReason::NoFeatureResolved => write!(f, "no feature present in dataset"),
            NaiveReason::InputSizeMismatch { expected, actual } => {
                write!(f, "model expects {} inputs, feature list has {}", expected, actual)
            }
            NaiveReason::ModelUnusable { error } => write!(f, "model unusable: {}", error),
        }
    }
}

/// 요청마다 한 번 결정되는 추론 방식.
pub enum InferenceStrategy<'m> {
    /// 피처 행렬을 만들어 모델 배치 호출
    Batched {
        model: &'m dyn Regressor,
        plan: FeaturePlan,
    },
    /// 모델 호출 없이 최신 행의 매출 값 사용
    Naive {
        priority: FeaturePlan,
        reason: NaiveReason,
    },
}

impl fmt::Debug for InferenceStrategy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceStrategy::Batched { model, plan } => f
                .debug_struct("Batched")
                .field("model", &model.model_name())
                .field("plan", plan)
                .finish(),
            InferenceStrategy::Naive { priority, reason } => f
                .debug_struct("Naive")
                .field("priority", priority)
                .field("reason", reason)
                .finish(),
        }
    }
}

impl<'m> InferenceStrategy<'m> {
    /// 모델, 테이블, 피처 목록으로 전략 선택.
    pub fn select<S: AsRef<str>>(
        model: &'m dyn Regressor,
        table: &CanonicalTable,
        features: &[S],
    ) -> Self {
        if features.is_empty() {
            return Self::naive(table, NaiveReason::EmptyFeatureList);
        }

        let plan = FeaturePlan::resolve(table, features);
        if plan.all_missing() {
            return Self::naive(table, NaiveReason::NoFeatureResolved);
        }

        if let Some(expected) = model.input_size() {
            if expected != plan.len() {
                return Self::naive(
                    table,
                    NaiveReason::InputSizeMismatch {
                        expected,
                        actual: plan.len(),
                    },
                );
            }
        }

        let missing = plan.missing_features();
        if !missing.is_empty() {
            debug!(?missing, "Features absent from dataset are filled with 0");
        }

        InferenceStrategy::Batched { model, plan }
    }

    /// 단순 전략 생성.
    pub fn naive(table: &CanonicalTable, reason: NaiveReason) -> Self {
        InferenceStrategy::Naive {
            priority: FeaturePlan::resolve(table, NAIVE_PRIORITY),
            reason,
        }
    }

    /// 메트릭/로그용 이름.
    pub fn name(&self) -> &'static str {
        match self {
            InferenceStrategy::Batched { .. } => "batched",
            InferenceStrategy::Naive { .. } => "naive",
        }
    }

    /// 단순 전략인지 확인.
    pub fn is_naive(&self) -> bool {
        matches!(self, InferenceStrategy::Naive { .. })
    }
}
