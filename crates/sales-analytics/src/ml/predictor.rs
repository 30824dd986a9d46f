//! 매출 회귀 모델.
//!
//! 모델은 별도로 학습되어야 하며, 다음 형식 중 하나로 제공됩니다:
//! - `.json`: 선형 모델 (`{"intercept": .., "coefficients": [..]}`)
//! - `.onnx`: ONNX 모델 (`ml` feature 필요)
//!
//! 모델 하나를 여러 요청이 공유하므로 `predict`는 `&self`를 받습니다.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ml::{FeatureMatrix, MlError, MlResult};

/// 다형성을 가능하게 하는 회귀 모델 trait.
pub trait Regressor: Send + Sync {
    /// 행렬의 각 행에 대한 예측값. 결과 길이는 행 수와 같아야 합니다.
    fn predict(&self, features: &FeatureMatrix) -> MlResult<Vec<f64>>;

    /// 모델 이름 반환.
    fn model_name(&self) -> &str;

    /// 모델이 선언한 입력 피처 수 (알 수 없으면 `None`).
    fn input_size(&self) -> Option<usize> {
        None
    }
}

/// JSON으로 저장된 선형 회귀 모델.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    /// 절편
    pub intercept: f64,
    /// 피처 순서대로의 계수
    pub coefficients: Vec<f64>,
    /// 로깅/식별을 위한 모델 이름
    #[serde(default = "default_linear_name")]
    pub name: String,
}

fn default_linear_name() -> String {
    "linear_regressor".to_string()
}

impl LinearRegressor {
    /// 새 선형 모델 생성.
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            intercept,
            coefficients,
            name: default_linear_name(),
        }
    }

    /// JSON 문자열에서 로드.
    pub fn from_json_str(content: &str) -> MlResult<Self> {
        let model: Self = serde_json::from_str(content)
            .map_err(|e| MlError::ModelLoad(format!("Invalid linear model: {}", e)))?;
        if !model.intercept.is_finite() || model.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(MlError::ModelLoad(
                "Linear model has non-finite parameters".to_string(),
            ));
        }
        Ok(model)
    }

    /// JSON 파일에서 로드.
    pub fn from_file(path: impl AsRef<Path>) -> MlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MlError::ModelLoad(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &FeatureMatrix) -> MlResult<Vec<f64>> {
        if features.cols() != self.coefficients.len() {
            return Err(MlError::ShapeMismatch {
                expected: self.coefficients.len(),
                actual: features.cols(),
            });
        }

        Ok(features
            .iter_rows()
            .map(|row| {
                self.intercept
                    + row
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(x, w)| x * w)
                        .sum::<f64>()
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }
}

/// 실제 모델 파일 없이 테스트하기 위한 mock 모델.
///
/// 기본 동작은 각 행의 합 + `offset`을 반환합니다.
#[derive(Debug, Default)]
pub struct MockRegressor {
    offset: f64,
    fixed_output: Option<f64>,
    input_size: Option<usize>,
    fail_batches: bool,
    fail_always: bool,
    fail_structurally: bool,
    failing_values: Vec<f64>,
    calls: AtomicUsize,
    rows_seen: AtomicUsize,
}

impl MockRegressor {
    /// 새 mock 모델 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 행 합계에 더할 값 설정.
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// 항상 반환할 고정 출력 설정.
    pub fn with_fixed_output(mut self, value: f64) -> Self {
        self.fixed_output = Some(value);
        self
    }

    /// 선언할 입력 크기 설정.
    pub fn with_input_size(mut self, size: usize) -> Self {
        self.input_size = Some(size);
        self
    }

    /// 2행 이상 배치 호출을 실패시킴.
    pub fn failing_batches(mut self) -> Self {
        self.fail_batches = true;
        self
    }

    /// 모든 호출을 실패시킴.
    pub fn failing_always(mut self) -> Self {
        self.fail_always = true;
        self
    }

    /// 모든 호출을 입력 크기 불일치로 실패시킴 (모델 자체를 쓸 수 없는 경우).
    pub fn failing_structurally(mut self) -> Self {
        self.fail_structurally = true;
        self
    }

    /// 이 값을 포함한 입력이 들어오면 실패.
    pub fn failing_on_value(mut self, value: f64) -> Self {
        self.failing_values.push(value);
        self
    }

    /// `predict` 호출 횟수.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 지금까지 입력된 전체 행 수.
    pub fn rows_seen(&self) -> usize {
        self.rows_seen.load(Ordering::SeqCst)
    }
}

impl Regressor for MockRegressor {
    fn predict(&self, features: &FeatureMatrix) -> MlResult<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows_seen.fetch_add(features.rows(), Ordering::SeqCst);

        if self.fail_structurally {
            return Err(MlError::ShapeMismatch {
                expected: features.cols() + 1,
                actual: features.cols(),
            });
        }
        if self.fail_always {
            return Err(MlError::Inference("mock failure".to_string()));
        }
        if self.fail_batches && features.rows() > 1 {
            return Err(MlError::Inference("mock batch failure".to_string()));
        }
        if features
            .as_slice()
            .iter()
            .any(|v| self.failing_values.contains(v))
        {
            return Err(MlError::InvalidInput("mock rejected value".to_string()));
        }

        Ok(features
            .iter_rows()
            .map(|row| {
                self.fixed_output
                    .unwrap_or_else(|| row.iter().sum::<f64>() + self.offset)
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "mock_regressor"
    }

    fn input_size(&self) -> Option<usize> {
        self.input_size
    }
}

/// ONNX 기반 회귀 모델.
///
/// 모델은 다음을 가져야 합니다:
/// - 입력: `[batch_size, features]` 형태의 float32 텐서
/// - 출력: `[batch_size]` 또는 `[batch_size, 1]` 형태의 float32 텐서
#[cfg(feature = "ml")]
pub struct OnnxRegressor {
    session: std::sync::Mutex<ort::session::Session>,
    model_name: String,
    input_name: String,
    input_size: Option<usize>,
}

#[cfg(feature = "ml")]
impl OnnxRegressor {
    /// 지정된 경로에서 ONNX 모델 로드.
    pub fn load(path: impl AsRef<Path>) -> MlResult<Self> {
        use ort::session::{builder::GraphOptimizationLevel, Session};

        let path = path.as_ref();
        if !path.exists() {
            return Err(MlError::ModelLoad(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        info!("Loading ONNX model from: {}", path.display());

        let session = Session::builder()
            .map_err(|e| MlError::ModelLoad(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| MlError::ModelLoad(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| MlError::ModelLoad(format!("Failed to load model: {}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());
        let model_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx_regressor".to_string());

        info!(model = %model_name, input = %input_name, "ONNX model loaded");

        Ok(Self {
            session: std::sync::Mutex::new(session),
            model_name,
            input_name,
            input_size: None,
        })
    }

    /// 입력 크기 선언.
    pub fn with_input_size(mut self, size: usize) -> Self {
        self.input_size = Some(size);
        self
    }
}

#[cfg(feature = "ml")]
impl Regressor for OnnxRegressor {
    fn predict(&self, features: &FeatureMatrix) -> MlResult<Vec<f64>> {
        let shape = [features.rows() as i64, features.cols() as i64];
        let input_tensor =
            ort::value::Tensor::from_array((shape, features.to_f32().into_boxed_slice()))
                .map_err(|e| MlError::Inference(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| MlError::Inference("ONNX session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| MlError::Inference(format!("Inference failed: {}", e)))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| MlError::Inference("No output tensor found".to_string()))?;

        // 텐서 데이터 추출 - (&Shape, &[f32]) 반환
        let (_, values) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MlError::Inference(format!("Failed to extract output tensor: {}", e)))?;

        if values.len() != features.rows() {
            return Err(MlError::ShapeMismatch {
                expected: features.rows(),
                actual: values.len(),
            });
        }

        Ok(values.iter().map(|v| f64::from(*v)).collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn input_size(&self) -> Option<usize> {
        self.input_size
    }
}

/// 확장자에 따라 모델 로드.
pub fn load_model(path: impl AsRef<Path>) -> MlResult<Arc<dyn Regressor>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => {
            let model = LinearRegressor::from_file(path)?;
            info!(
                model = %model.name,
                coefficients = model.coefficients.len(),
                "Linear model loaded"
            );
            Ok(Arc::new(model))
        }
        #[cfg(feature = "ml")]
        "onnx" => Ok(Arc::new(OnnxRegressor::load(path)?)),
        #[cfg(not(feature = "ml"))]
        "onnx" => Err(MlError::ModelLoad(format!(
            "{}: ONNX models require the `ml` feature",
            path.display()
        ))),
        other => Err(MlError::ModelLoad(format!(
            "Unsupported model format '{}': {}",
            other,
            path.display()
        ))),
    }
}
