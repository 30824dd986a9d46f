//! 예측 차트 설명.
//!
//! 요청 타임라인을 정규화하고 월별 변화량을 미리 계산해 프롬프트로 만듭니다.
//! 실제 LLM 호출은 API crate가 담당합니다.

pub mod prompt;
pub mod timeline;

pub use prompt::{build_prompt, render_focus_facts, render_global_facts, SYSTEM_PROMPT};
pub use timeline::{
    extract_request, focus_index, normalize_points, pairs, percent_change, pick_value, Delta,
    ExplainRequest, Focus, TimelineError, TimelinePoint, MAX_POINTS, VALUE_KEYS,
};
