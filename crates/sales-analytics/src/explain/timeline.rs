//! 설명 요청의 타임라인 정규화.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// 프롬프트에 넣는 최근 포인트 수.
pub const MAX_POINTS: usize = 18;

/// 포인트 값으로 읽는 키 (우선순위 순).
pub const VALUE_KEYS: &[&str] = &[
    "total",
    "total_sales",
    "sales",
    "value",
    "amount",
    "y",
    "sum",
    "pred",
    "predicted",
];

/// source가 없을 때의 기본값.
pub const DEFAULT_SOURCE: &str = "history";

/// 잘못된 설명 요청.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("Expected a list or an object with a 'timeline' key.")]
    NotATimeline,

    #[error("Timeline must be a non-empty list.")]
    EmptyTimeline,

    #[error("No usable timeline points.")]
    NoUsablePoints,
}

/// 정규화된 타임라인 포인트.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    /// `YYYY-MM-DD` (입력 앞 10자)
    pub date: String,
    pub value: f64,
    /// `history` 또는 `forecast`
    pub source: String,
}

/// 사용자가 선택한 포인트.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Focus {
    pub date: Option<String>,
    pub value: Option<f64>,
    pub source: Option<String>,
}

impl Focus {
    fn from_object(object: &serde_json::Map<String, Value>) -> Self {
        Self {
            date: object.get("date").and_then(date_prefix),
            value: object.get("value").and_then(numeric),
            source: object
                .get("source")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// 요청 본문에서 꺼낸 타임라인과 포커스.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainRequest {
    pub timeline: Vec<Value>,
    pub focus: Option<Focus>,
}

/// 연속된 두 포인트 사이의 변화.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    pub from_date: String,
    pub to_date: String,
    pub from_value: f64,
    pub to_value: f64,
    pub to_source: String,
    pub dv: f64,
    /// 이전 값이 0이면 `None`
    pub pct: Option<f64>,
}

impl Delta {
    /// 두 포인트 사이 변화 계산.
    pub fn between(from: &TimelinePoint, to: &TimelinePoint) -> Self {
        let dv = to.value - from.value;
        Self {
            from_date: from.date.clone(),
            to_date: to.date.clone(),
            from_value: from.value,
            to_value: to.value,
            to_source: to.source.clone(),
            dv,
            pct: percent_change(from.value, dv),
        }
    }
}

/// 변화율(%) 계산. 기준값이 0이면 `None`.
pub fn percent_change(base: f64, dv: f64) -> Option<f64> {
    (base != 0.0).then(|| dv / base * 100.0)
}

/// 요청 본문 해석.
///
/// 배열 자체 또는 `{"timeline": [...], "focus": {...}}` 형태를 받습니다.
pub fn extract_request(body: &Value) -> Result<ExplainRequest, TimelineError> {
    let (timeline, focus) = match body {
        Value::Array(_) => (body, None),
        Value::Object(object) => {
            let timeline = object.get("timeline").ok_or(TimelineError::NotATimeline)?;
            let focus = object
                .get("focus")
                .and_then(Value::as_object)
                .map(Focus::from_object);
            (timeline, focus)
        }
        _ => return Err(TimelineError::NotATimeline),
    };

    match timeline.as_array() {
        Some(items) if !items.is_empty() => Ok(ExplainRequest {
            timeline: items.clone(),
            focus,
        }),
        _ => Err(TimelineError::EmptyTimeline),
    }
}

/// 항목의 값 읽기.
///
/// [`VALUE_KEYS`] 중 처음 존재하는 키가 결정합니다. 그 키의 값이 숫자로
/// 해석되지 않으면 다음 키로 넘어가지 않고 `None`입니다.
pub fn pick_value(entry: &serde_json::Map<String, Value>) -> Option<f64> {
    VALUE_KEYS
        .iter()
        .find_map(|key| entry.get(*key))
        .and_then(numeric)
}

fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn date_prefix(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let prefix: String = text.chars().take(10).collect();
    (!prefix.is_empty()).then_some(prefix)
}

/// 타임라인 정규화.
///
/// 날짜나 값이 없는 항목은 버리고, 날짜 문자열 순으로 정렬한 뒤
/// 최근 [`MAX_POINTS`]개만 남깁니다.
pub fn normalize_points(timeline: &[Value]) -> Result<Vec<TimelinePoint>, TimelineError> {
    let mut points: Vec<TimelinePoint> = timeline
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            let date = entry.get("date").and_then(date_prefix)?;
            let value = pick_value(entry)?;
            let source = entry
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_SOURCE)
                .to_string();
            Some(TimelinePoint {
                date,
                value,
                source,
            })
        })
        .collect();

    if points.is_empty() {
        return Err(TimelineError::NoUsablePoints);
    }

    points.sort_by(|a, b| a.date.cmp(&b.date));
    let start = points.len().saturating_sub(MAX_POINTS);
    Ok(points.split_off(start))
}

/// 연속 포인트 쌍의 변화 목록.
pub fn pairs(points: &[TimelinePoint]) -> Vec<Delta> {
    points
        .windows(2)
        .map(|pair| Delta::between(&pair[0], &pair[1]))
        .collect()
}

/// 날짜로 포인트 위치 찾기. 없으면 마지막 포인트.
pub fn focus_index(points: &[TimelinePoint], date: &str) -> usize {
    let wanted: String = date.chars().take(10).collect();
    points
        .iter()
        .position(|point| point.date == wanted)
        .unwrap_or_else(|| points.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_request_shapes() {
        let list = json!([{"date": "2021-01-01", "total": 1}]);
        let req = extract_request(&list).unwrap();
        assert_eq!(req.timeline.len(), 1);
        assert!(req.focus.is_none());

        let wrapped = json!({
            "timeline": [{"date": "2021-01-01", "total": 1}],
            "focus": {"date": "2021-01-01T00:00:00", "value": "5", "source": "forecast"}
        });
        let req = extract_request(&wrapped).unwrap();
        assert_eq!(
            req.focus,
            Some(Focus {
                date: Some("2021-01-01".into()),
                value: Some(5.0),
                source: Some("forecast".into()),
            })
        );

        assert_eq!(
            extract_request(&json!({"points": []})),
            Err(TimelineError::NotATimeline)
        );
        assert_eq!(extract_request(&json!(42)), Err(TimelineError::NotATimeline));
        assert_eq!(extract_request(&json!([])), Err(TimelineError::EmptyTimeline));
        assert_eq!(
            extract_request(&json!({"timeline": "x"})),
            Err(TimelineError::EmptyTimeline)
        );
    }

    #[test]
    fn test_pick_value_first_present_key_decides() {
        let entry = json!({"sales": "12.5", "value": 3});
        assert_eq!(pick_value(entry.as_object().unwrap()), Some(12.5));

        // 먼저 나오는 키의 값이 숫자가 아니면 다음 키를 보지 않음
        let entry = json!({"total": "n/a", "value": 3});
        assert_eq!(pick_value(entry.as_object().unwrap()), None);

        let entry = json!({"predicted": 7});
        assert_eq!(pick_value(entry.as_object().unwrap()), Some(7.0));

        let entry = json!({"other": 7});
        assert_eq!(pick_value(entry.as_object().unwrap()), None);
    }

    #[test]
    fn test_normalize_points_sorts_and_filters() {
        let timeline = json!([
            {"date": "2021-03-01T00:00:00Z", "total": 30, "source": "forecast"},
            {"date": "2021-01-01", "sales": 10},
            {"date": "", "total": 5},
            {"total": 5},
            {"date": "2021-02-01", "total": null},
            "garbage",
            {"date": "2021-02-01", "y": "20"}
        ]);
        let points = normalize_points(timeline.as_array().unwrap()).unwrap();
        let dates: Vec<&str> = points.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2021-01-01", "2021-02-01", "2021-03-01"]);
        assert_eq!(points[0].source, "history");
        assert_eq!(points[2].source, "forecast");
    }

    #[test]
    fn test_normalize_points_keeps_recent_window() {
        let timeline: Vec<Value> = (0..30)
            .map(|i| json!({"date": format!("{}-{:02}-01", 2019 + i / 12, i % 12 + 1), "total": i}))
            .collect();
        let points = normalize_points(&timeline).unwrap();
        assert_eq!(points.len(), MAX_POINTS);
        assert_eq!(points[0].value, 12.0);
        assert_eq!(points.last().unwrap().value, 29.0);
    }

    #[test]
    fn test_normalize_points_empty() {
        let timeline = json!([{"date": "2021-01-01"}]);
        assert_eq!(
            normalize_points(timeline.as_array().unwrap()),
            Err(TimelineError::NoUsablePoints)
        );
    }

    #[test]
    fn test_pairs_and_pct() {
        let point = |date: &str, value: f64| TimelinePoint {
            date: date.into(),
            value,
            source: "history".into(),
        };
        let deltas = pairs(&[
            point("2021-01-01", 0.0),
            point("2021-02-01", 50.0),
            point("2021-03-01", 25.0),
        ]);
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].pct, None);
        assert_eq!(deltas[1].dv, -25.0);
        assert_eq!(deltas[1].pct, Some(-50.0));
    }

    #[test]
    fn test_focus_index_fallback() {
        let points = vec![
            TimelinePoint {
                date: "2021-01-01".into(),
                value: 1.0,
                source: "history".into(),
            },
            TimelinePoint {
                date: "2021-02-01".into(),
                value: 2.0,
                source: "history".into(),
            },
        ];
        assert_eq!(focus_index(&points, "2021-01-01T10:00"), 0);
        assert_eq!(focus_index(&points, "1999-01-01"), 1);
    }
}
