//! 데이터셋 버전과 피처 목록 서명.
//!
//! 결과 캐시 키에 포함되어, 데이터셋이 다시 로드되면 이전 결과를 쓰지 않도록 합니다.

use std::fmt;

use sales_core::RawTable;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 지문 길이 (hex 문자 수).
const FINGERPRINT_LEN: usize = 16;

/// 데이터셋 버전.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetVersion(String);

impl DatasetVersion {
    /// 명시적 버전 태그.
    pub fn explicit(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// 행 수와 컬럼 집합으로 계산한 지문.
    ///
    /// 컬럼 순서는 무시합니다.
    pub fn fingerprint(row_count: usize, columns: &[String]) -> Self {
        let mut sorted: Vec<&str> = columns.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut hasher = Sha256::new();
        hasher.update(row_count.to_le_bytes());
        for column in sorted {
            hasher.update(b"\x1f");
            hasher.update(column.as_bytes());
        }
        let digest = hex::encode(hasher.finalize());
        Self(format!("rows{row_count}-{}", &digest[..FINGERPRINT_LEN]))
    }

    /// 명시적 태그가 있으면 그것을, 없으면 테이블 지문을 사용.
    pub fn resolve(explicit: Option<&str>, table: &RawTable) -> Self {
        match explicit.map(str::trim).filter(|tag| !tag.is_empty()) {
            Some(tag) => Self::explicit(tag),
            None => Self::fingerprint(table.len(), table.columns()),
        }
    }

    /// 문자열 표현.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 순서를 포함한 피처 목록 서명 (sha256 hex 앞 16자).
pub fn feature_signature(features: &[String]) -> String {
    let mut hasher = Sha256::new();
    for feature in features {
        hasher.update(feature.as_bytes());
        hasher.update(b"\x1f");
    }
    let digest = hex::encode(hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}
