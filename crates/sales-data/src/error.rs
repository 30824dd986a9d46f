//! 데이터 모듈 오류 타입.

use sales_core::SchemaError;
use thiserror::Error;

/// 아티팩트 로딩 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 파일 입출력 오류
    #[error("I/O error on {path}: {source}")]
    Io {
        /// 대상 경로
        path: String,
        /// 원인
        #[source]
        source: std::io::Error,
    },

    /// CSV 형식 오류
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON 등 내용 해석 오류
    #[error("Parse error: {0}")]
    Parse(String),

    /// 모델 로딩 오류
    #[error("Model error: {0}")]
    Model(String),

    /// 데이터셋 스키마 오류
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl DataError {
    /// 경로 정보를 포함한 I/O 오류 생성.
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
