//! 로컬 파일에서 데이터셋과 피처 목록 로딩.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sales_core::RawTable;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{DataError, Result};

/// CSV 파일을 원본 테이블로 읽기.
///
/// 헤더의 BOM과 셀 앞뒤 공백은 제거합니다. 컬럼 수가 다른 행은
/// 빈 셀로 채우거나 잘라냅니다.
pub fn read_table(path: impl AsRef<Path>) -> Result<RawTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let table = read_table_from_reader(file)?;

    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "Dataset loaded"
    );
    Ok(table)
}

/// 임의의 reader에서 CSV 테이블 읽기.
pub fn read_table_from_reader<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut table = RawTable::new(columns);
    let mut malformed = 0usize;
    for record in reader.records() {
        match record {
            Ok(record) => table.push_row(record.iter().map(str::to_string).collect()),
            Err(e) => {
                malformed += 1;
                warn!(error = %e, "Skipping malformed CSV record");
            }
        }
    }

    if malformed > 0 {
        warn!(malformed, "CSV contained malformed records");
    }
    Ok(table)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureListFile {
    List(Vec<String>),
    Wrapped { features: Vec<String> },
}

/// 모델 입력 피처 목록 읽기.
///
/// JSON 배열(`["a", "b"]`) 또는 `{"features": [...]}` 형식을 받습니다.
/// 순서가 모델 입력 순서입니다.
pub fn read_feature_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
    let features = parse_feature_list(&content)?;

    info!(path = %path.display(), count = features.len(), "Feature list loaded");
    Ok(features)
}

/// 피처 목록 JSON 파싱.
pub fn parse_feature_list(content: &str) -> Result<Vec<String>> {
    let parsed: FeatureListFile = serde_json::from_str(content)
        .map_err(|e| DataError::Parse(format!("invalid feature list: {e}")))?;
    Ok(match parsed {
        FeatureListFile::List(features) | FeatureListFile::Wrapped { features } => features,
    })
}
