//! 매출 예측 모델 추론.
//!
//! 이 모듈은 다음을 제공합니다:
//! - 회귀 모델 trait과 구현 (선형 JSON, ONNX, 테스트용 mock)
//! - 피처 이름 해석과 입력 행렬 구성
//! - 요청 단위 추론 전략 선택 (배치 / 단순)
//! - 매장별 미리보기 엔진
//!
//! # 아키텍처
//!
//! ```text
//! CanonicalTable ──▶ FeaturePlan ──▶ FeatureMatrix ──▶ Regressor ──▶ PreviewOutcome
//!                         │                                              ▲
//!                         └────────── (fallback) NAIVE_PRIORITY ─────────┘
//! ```

pub mod error;
pub mod features;
pub mod predictor;
pub mod preview;
pub mod strategy;

pub use error::{MlError, MlResult};
pub use features::{FeatureMatrix, FeaturePlan, FeatureSource};
#[cfg(feature = "ml")]
pub use predictor::OnnxRegressor;
pub use predictor::{load_model, LinearRegressor, MockRegressor, Regressor};
pub use preview::{preview, PreviewEngine, PreviewOutcome, SkipReason};
pub use strategy::{InferenceStrategy, NaiveReason, NAIVE_PRIORITY};
