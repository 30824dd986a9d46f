//! # Sales Core
//!
//! 매장 매출 예측 서비스의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 서비스 전반에서 사용되는 기본 타입을 제공합니다:
//! - 원본 테이블 / 정규화된(canonical) 테이블 타입
//! - 컬럼 별칭 기반 스키마 정규화
//! - 매장별 월간 집계
//! - 예측 대상(eligible) 매장 필터
//! - 소수점 2자리 반올림
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
