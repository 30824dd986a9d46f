//! 예측 설명용 프롬프트 구성.
//!
//! 모델에는 미리 계산한 월별 변화량만 전달하고, 수치를 다시 계산하거나
//! 월을 옮기지 않도록 규칙을 명시합니다.

use std::fmt::Write;

use super::timeline::{focus_index, pairs, percent_change, Focus, TimelinePoint};

/// system 메시지.
pub const SYSTEM_PROMPT: &str = "You are a precise retail analyst. Be numeric and concrete.";

fn format_pct(pct: Option<f64>) -> String {
    pct.map_or_else(|| "NA".to_string(), |p| format!("{:.2}", p))
}

fn delta_line(label: &str, from: &TimelinePoint, to: &TimelinePoint) -> String {
    let dv = to.value - from.value;
    format!(
        "{}: {} → {}, dv:{:.2}, pct:{}",
        label,
        from.date,
        to.date,
        dv,
        format_pct(percent_change(from.value, dv))
    )
}

/// 포커스 행 주변 (이전 2개, 다음 1개) CSV와 변화량.
pub fn render_focus_facts(points: &[TimelinePoint], index: usize) -> String {
    let focus = &points[index];
    let prev2 = index.checked_sub(2).and_then(|i| points.get(i));
    let prev1 = index.checked_sub(1).and_then(|i| points.get(i));
    let next = points.get(index + 1);

    let mut out = String::from("FOCUS_ROWS (CSV):\ndate,value,source");
    for point in [prev2, prev1, Some(focus), next].into_iter().flatten() {
        let _ = write!(out, "\n{},{:.2},{}", point.date, point.value, point.source);
    }

    if let Some(prev1) = prev1 {
        out.push('\n');
        out.push_str(&delta_line("prev_vs_focus", prev1, focus));
    }
    if let (Some(prev2), Some(_)) = (prev2, prev1) {
        out.push('\n');
        out.push_str(&delta_line("prev2_vs_focus", prev2, focus));
    }
    if let Some(next) = next {
        out.push('\n');
        out.push_str(&delta_line("focus_vs_next", focus, next));
    }
    out
}

/// 모든 연속 쌍의 변화량 표.
pub fn render_global_facts(points: &[TimelinePoint]) -> String {
    let mut out = String::from("PAIRS (from,to,from_val,to_val,dv,pct,to_source)");
    for delta in pairs(points) {
        let _ = write!(
            out,
            "\n{},{},{:.2},{:.2},{:.2},{},{}",
            delta.from_date,
            delta.to_date,
            delta.from_value,
            delta.to_value,
            delta.dv,
            format_pct(delta.pct),
            delta.to_source
        );
    }
    out
}

/// user 프롬프트 생성.
///
/// 포커스 날짜가 있으면 해당 월만 설명하도록, 없으면 전체 흐름을 요약하도록 합니다.
/// `points`는 비어있지 않아야 합니다.
pub fn build_prompt(points: &[TimelinePoint], focus: Option<&Focus>) -> String {
    let focus_date = focus.and_then(|f| f.date.as_deref());

    match focus_date {
        Some(date) if !points.is_empty() => {
            let index = focus_index(points, date);
            let row = &points[index];
            format!(
                "You are a careful retail analyst.\n\
                 \n\
                 FOCUS_DATE: {date}\n\
                 FOCUS_SOURCE: {source}\n\
                 \n\
                 {facts}\n\
                 \n\
                 STRICT RULES:\n\
                 - Every change is (to_value - from_value) for the exact dates listed. Never shift or guess months.\n\
                 - Talk about the FOCUS_DATE month only; do not summarize any other month.\n\
                 - When FOCUS_SOURCE == \"forecast\", write \" (forecast)\" after the month name.\n\
                 \n\
                 TASK:\n\
                 - Exactly 3 bullets on the focus month, quantifying the change against the previous month (and the one before, if listed) with the dv/pct from FOCUS_ROWS.\n\
                 - One bullet placing the focus value within the surrounding months in FOCUS_ROWS (high, low or outlier).\n\
                 - End with **Next actions:** followed by exactly 2 short actions tied to the focus month.\n\
                 - Markdown bullets only, no preamble.\n",
                date = row.date,
                source = row.source,
                facts = render_focus_facts(points, index),
            )
        }
        _ => format!(
            "You are a precise retail analyst.\n\
             \n\
             {facts}\n\
             \n\
             STRICT RULES:\n\
             - Each change belongs to the PAIR 'from_date → to_date' with dv/pct exactly as listed; never realign months.\n\
             - When a pair's to_source == \"forecast\", write \"(forecast)\" after the TO month.\n\
             \n\
             TASK:\n\
             - Summarize the main month-to-month changes from PAIRS in 3 to 5 bullets.\n\
             - Name the single largest rise and the single largest drop.\n\
             - End with **Next actions:** followed by exactly 2 data-specific actions.\n\
             - Markdown bullets only, no preamble.\n",
            facts = render_global_facts(points),
        ),
    }
}
