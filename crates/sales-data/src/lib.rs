//! 데이터 아티팩트 관리.
//!
//! 이 crate는 다음을 제공합니다:
//! - CSV 데이터셋 및 피처 목록 로딩
//! - 데이터셋 버전 / 피처 목록 서명
//! - 데이터셋 제공자 인터페이스
//! - 프로세스 내 TTL 결과 캐시

pub mod cache;
pub mod error;
pub mod loader;
pub mod provider;
pub mod version;

pub use cache::{CacheEntry, CacheLookup, CacheStats, TtlCache, DEFAULT_TTL};
pub use error::{DataError, Result};
pub use loader::{parse_feature_list, read_feature_list, read_table, read_table_from_reader};
pub use provider::{DatasetProvider, LoadedArtifacts};
pub use version::{feature_signature, DatasetVersion};
