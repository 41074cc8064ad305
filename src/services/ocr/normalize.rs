// Normalizer for JSON OCR output of heterogeneous shape
//
// Accepted shapes (per entry, "line"):
//   [quad, [text, conf]]          quad = [[x, y], ...] of any length >= 1
//   [quad, text]                  confidence defaults to DEFAULT_CONFIDENCE
//   {"text", "confidence"|"conf"|"score", "box": {x, y, w, h}}
//   {"text", ..., "bbox": quad | [x1, y1, x2, y2]}
// Containers:
//   [line, ...]                   flat
//   [[line, ...], ...]            nested per page, null pages allowed
//   null                          nothing detected
// Entries that match none of these are skipped.

use serde_json::Value;

use super::RawToken;
use crate::core::types::ConfidenceScale;

/// Confidence assigned to entries that carry text without a score (0-100 scale)
const DEFAULT_CONFIDENCE: f64 = 99.0;

/// Scores are read on `scale`; entries without a score get `DEFAULT_CONFIDENCE`.
pub fn tokens_from_value(raw: &Value, scale: ConfidenceScale) -> Vec<RawToken> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    let Some(first) = items.iter().find(|v| !v.is_null()) else {
        return Vec::new();
    };

    if is_line(first) {
        return items.iter().filter_map(|v| token_from_line(v, scale)).collect();
    }

    // Nested: one array of lines per page
    items
        .iter()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|v| token_from_line(v, scale))
        .collect()
}

fn is_line(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key("text"),
        Value::Array(parts) => {
            parts.len() == 2
                && points_of(&parts[0]).is_some()
                && (parts[1].is_string() || text_and_score(&parts[1]).is_some())
        }
        _ => false,
    }
}

fn token_from_line(value: &Value, scale: ConfidenceScale) -> Option<RawToken> {
    match value {
        Value::Object(map) => {
            let text = map.get("text")?.as_str()?.to_string();
            let confidence = ["confidence", "conf", "score"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_f64))
                .map_or(DEFAULT_CONFIDENCE, |c| scale.to_percent(c));
            let (left, top, width, height) = match map.get("box") {
                Some(b) => rect_of(b)?,
                None => bounds_of(map.get("bbox")?)?,
            };
            Some(build(text, confidence, left, top, width, height))
        }
        Value::Array(parts) if parts.len() == 2 => {
            let (left, top, width, height) = bounds_of(&parts[0])?;
            let (text, confidence) = match &parts[1] {
                Value::String(s) => (s.clone(), DEFAULT_CONFIDENCE),
                other => {
                    let (text, score) = text_and_score(other)?;
                    (text, scale.to_percent(score))
                }
            };
            Some(build(text, confidence, left, top, width, height))
        }
        _ => None,
    }
}

fn build(text: String, confidence: f64, left: f64, top: f64, width: f64, height: f64) -> RawToken {
    RawToken {
        text,
        confidence: confidence as f32,
        left: left as f32,
        top: top as f32,
        width: width as f32,
        height: height as f32,
    }
}

fn text_and_score(value: &Value) -> Option<(String, f64)> {
    let parts = value.as_array()?;
    if parts.len() != 2 {
        return None;
    }
    Some((parts[0].as_str()?.to_string(), parts[1].as_f64()?))
}

fn points_of(value: &Value) -> Option<Vec<(f64, f64)>> {
    let points = value.as_array()?;
    if points.is_empty() {
        return None;
    }
    points
        .iter()
        .map(|p| {
            let xy = p.as_array()?;
            if xy.len() < 2 {
                return None;
            }
            Some((xy[0].as_f64()?, xy[1].as_f64()?))
        })
        .collect()
}

/// Bounding box of a polygon, or of a flat `[x1, y1, x2, y2]`.
fn bounds_of(value: &Value) -> Option<(f64, f64, f64, f64)> {
    if let Some(points) = points_of(value) {
        let min_x = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_x = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        return Some((min_x, min_y, max_x - min_x, max_y - min_y));
    }

    let flat: Vec<f64> = value
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect::<Option<_>>()?;
    match flat.as_slice() {
        [x1, y1, x2, y2] => Some((x1.min(*x2), y1.min(*y2), (x2 - x1).abs(), (y2 - y1).abs())),
        _ => None,
    }
}

fn rect_of(value: &Value) -> Option<(f64, f64, f64, f64)> {
    let get = |k: &str| value.get(k).and_then(Value::as_f64);
    Some((get("x")?, get("y")?, get("w")?, get("h")?))
}
