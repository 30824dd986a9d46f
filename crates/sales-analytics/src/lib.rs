//! 매출 예측 분석.
//!
//! - [`ml`]: 회귀 모델, 피처 구성, 추론 전략, 매장별 미리보기
//! - [`explain`]: 예측 설명 프롬프트

pub mod explain;
pub mod ml;

pub use explain::{build_prompt, extract_request, normalize_points, TimelineError, TimelinePoint};
pub use ml::{
    load_model, preview, FeaturePlan, InferenceStrategy, LinearRegressor, MlError, MlResult,
    MockRegressor, PreviewEngine, PreviewOutcome, Regressor, SkipReason,
};
