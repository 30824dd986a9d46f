//! 데이터셋 제공자.
//!
//! 프로세스 시작 시 로드된 테이블, 모델, 피처 목록을 묶어 제공합니다.
//! 모델 타입은 제공자가 정하며, 이 크레이트는 모델을 해석하지 않습니다.

use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use sales_core::{DataConfig, Dataset, RawTable};
use tracing::{info, warn};

use crate::error::{DataError, Result};
use crate::loader::{read_feature_list, read_table};
use crate::version::{feature_signature, DatasetVersion};

/// 예측 파이프라인이 요구하는 아티팩트 접근 인터페이스.
pub trait DatasetProvider: Send + Sync {
    /// 모델 타입 (보통 `dyn Regressor`)
    type Model: ?Sized;

    /// 데이터셋 (정규화 결과 포함).
    fn dataset(&self) -> &Dataset;

    /// 학습된 모델.
    fn model(&self) -> &Self::Model;

    /// 모델 입력 피처 이름 (입력 순서).
    fn feature_list(&self) -> &[String];

    /// 데이터셋 버전.
    fn version(&self) -> &DatasetVersion;

    /// 피처 목록 서명.
    fn feature_signature(&self) -> String {
        feature_signature(self.feature_list())
    }
}

/// 로컬 파일에서 로드한 아티팩트.
pub struct LoadedArtifacts<M: ?Sized> {
    dataset: Dataset,
    model: Arc<M>,
    features: Vec<String>,
    version: DatasetVersion,
    signature: String,
}

impl<M: ?Sized> LoadedArtifacts<M> {
    /// 이미 메모리에 있는 아티팩트로 생성.
    pub fn new(
        table: RawTable,
        model: Arc<M>,
        features: Vec<String>,
        explicit_version: Option<&str>,
    ) -> Self {
        let version = DatasetVersion::resolve(explicit_version, &table);
        let signature = feature_signature(&features);
        Self {
            dataset: Dataset::new(table),
            model,
            features,
            version,
            signature,
        }
    }

    /// 설정된 경로에서 데이터셋, 피처 목록, 모델을 로드.
    ///
    /// 모델 해석은 `load_model`에 맡깁니다. 스키마 정규화도 이 시점에 한 번 수행하며,
    /// 실패해도 로드는 성공합니다 (요청 시 에러로 보고됨).
    pub fn load<F, E>(config: &DataConfig, load_model: F) -> Result<Self>
    where
        F: FnOnce(&Path) -> std::result::Result<Arc<M>, E>,
        E: Display,
    {
        let table = read_table(&config.dataset_path)?;
        let features = read_feature_list(&config.features_path)?;
        let model = load_model(&config.model_path).map_err(|e| {
            DataError::Model(format!("{}: {e}", config.model_path.display()))
        })?;

        let artifacts = Self::new(table, model, features, config.dataset_version.as_deref());

        match artifacts.dataset.normalized() {
            Ok(table) => info!(
                version = %artifacts.version,
                rows = table.len(),
                dropped = table.report.dropped_rows(),
                categories = table.category_columns.len(),
                features = artifacts.features.len(),
                "Artifacts loaded"
            ),
            Err(e) => warn!(
                version = %artifacts.version,
                error = %e,
                "Artifacts loaded but dataset schema is not usable"
            ),
        }

        Ok(artifacts)
    }

    /// 모델 공유 핸들.
    pub fn model_arc(&self) -> Arc<M> {
        Arc::clone(&self.model)
    }
}

impl<M> DatasetProvider for LoadedArtifacts<M>
where
    M: ?Sized + Send + Sync,
{
    type Model = M;

    fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn model(&self) -> &M {
        &self.model
    }

    fn feature_list(&self) -> &[String] {
        &self.features
    }

    fn version(&self) -> &DatasetVersion {
        &self.version
    }

    fn feature_signature(&self) -> String {
        self.signature.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn config(dir: &tempfile::TempDir) -> DataConfig {
        DataConfig {
            dataset_path: write_file(
                dir,
                "sales.csv",
                "Store Number,Date,Total_Sales\n7,2021-01-01,10\n7,2021-02-01,12\n",
            ),
            features_path: write_file(dir, "features.json", r#"["Total_Sales"]"#),
            model_path: dir.path().join("model.bin"),
            dataset_version: None,
        }
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let artifacts: LoadedArtifacts<str> =
            LoadedArtifacts::load(&config, |_| Ok::<_, String>(Arc::from("model"))).unwrap();

        assert_eq!(artifacts.dataset().row_count(), 2);
        assert!(artifacts.dataset().is_normalized());
        assert_eq!(artifacts.feature_list(), &["Total_Sales".to_string()]);
        assert_eq!(artifacts.model(), "model");
        assert!(artifacts.version().as_str().starts_with("rows2-"));
        assert_eq!(
            artifacts.feature_signature(),
            feature_signature(&["Total_Sales".to_string()])
        );
    }

    #[test]
    fn test_explicit_version_tag() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.dataset_version = Some("release-3".into());

        let artifacts: LoadedArtifacts<str> =
            LoadedArtifacts::load(&config, |_| Ok::<_, String>(Arc::from("m"))).unwrap();
        assert_eq!(artifacts.version().as_str(), "release-3");
    }

    #[test]
    fn test_model_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let result: Result<LoadedArtifacts<str>> =
            LoadedArtifacts::load(&config, |_| Err("corrupt"));
        match result {
            Err(DataError::Model(message)) => {
                assert!(message.contains("model.bin"));
                assert!(message.contains("corrupt"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected model error"),
        }
    }

    #[test]
    fn test_missing_dataset_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.dataset_path = dir.path().join("missing.csv");

        let result: Result<LoadedArtifacts<str>> =
            LoadedArtifacts::load(&config, |_| Ok::<_, String>(Arc::from("m")));
        assert!(matches!(result, Err(DataError::Io { .. })));
    }

    #[test]
    fn test_schema_problem_does_not_fail_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.dataset_path = write_file(&dir, "bad.csv", "foo,bar\n1,2\n");

        let artifacts: LoadedArtifacts<str> =
            LoadedArtifacts::load(&config, |_| Ok::<_, String>(Arc::from("m"))).unwrap();
        assert!(artifacts.dataset().normalized().is_err());
    }
}
