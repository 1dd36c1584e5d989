//! Normalization of raw design-data records into the canonical feature model.
//!
//! Records carry their geometry under `final_geojson`, usually as a GeoJSON
//! FeatureCollection whose first feature holds the coordinates. A bare Feature
//! or a bare geometry object is accepted as well. Records whose geometry is
//! missing or malformed are dropped here and never reach the core.

use crate::domain::model::{Damper, Duct, Point, Record};
use serde_json::Value;
use std::collections::HashSet;

const GEOMETRY_FIELD: &str = "final_geojson";
const UNKNOWN_ID: &str = "unknown";

/// Flattens a point-feature response into records. The service answers either
/// with a bare array or with a `{"data": {"results": [...]}}` envelope.
pub fn records_from_response(response: Value) -> Vec<Record> {
    let items = match response {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Object(mut data)) => match data.remove("results") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) => Some(Record {
                data: obj.into_iter().collect(),
            }),
            _ => None,
        })
        .collect()
}

fn record_id(record: &Record) -> String {
    match record.data.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            tracing::warn!("Feature record without id, using '{}'", UNKNOWN_ID);
            UNKNOWN_ID.to_string()
        }
    }
}

/// Coordinates array of the record's first feature, whatever the wrapping.
fn geometry_coordinates(record: &Record) -> Option<&Value> {
    let geojson = record.data.get(GEOMETRY_FIELD)?;
    if geojson.is_null() {
        return None;
    }

    let feature = match geojson.get("features") {
        Some(Value::Array(features)) => features.first()?,
        Some(_) => return None,
        None => geojson,
    };

    match feature.get("geometry") {
        Some(geometry) => geometry.get("coordinates"),
        None => feature.get("coordinates"),
    }
}

fn coordinate(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn point(value: &Value) -> Option<Point> {
    let pair = value.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    Some(Point::new(coordinate(&pair[0])?, coordinate(&pair[1])?))
}

pub fn extract_damper(record: &Record) -> Option<Damper> {
    let location = geometry_coordinates(record).and_then(point)?;

    Some(Damper {
        id: record_id(record),
        location,
        kind: record
            .data
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string),
        confidence: record.data.get("confidence").and_then(Value::as_f64),
    })
}

pub fn extract_duct(record: &Record) -> Option<Duct> {
    let coords = geometry_coordinates(record)?.as_array()?;
    if coords.len() < 2 {
        return None;
    }

    // 任何一個座標無效就整筆丟棄，不產生殘缺的管線
    let points = coords.iter().map(point).collect::<Option<Vec<_>>>()?;
    Some(Duct::new(record_id(record), points))
}

/// Ids carried by more than one damper, in first-repeat order. Such dampers
/// share a single mapping entry downstream.
pub fn duplicate_ids(dampers: &[Damper]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for damper in dampers {
        let id = damper.id.as_str();
        if !seen.insert(id) && !repeated.contains(&id) {
            repeated.push(id);
        }
    }
    repeated
}

pub fn extract_dampers(records: &[Record]) -> Vec<Damper> {
    let dampers: Vec<Damper> = records.iter().filter_map(extract_damper).collect();
    if dampers.len() < records.len() {
        tracing::debug!(
            "Dropped {} damper records without usable geometry",
            records.len() - dampers.len()
        );
    }

    for id in duplicate_ids(&dampers) {
        tracing::warn!(
            "⚠️ Damper id '{}' appears more than once; those dampers share one mapping entry",
            id
        );
    }
    dampers
}

pub fn extract_ducts(records: &[Record]) -> Vec<Duct> {
    let ducts: Vec<Duct> = records.iter().filter_map(extract_duct).collect();
    if ducts.len() < records.len() {
        tracing::debug!(
            "Dropped {} duct records without usable geometry",
            records.len() - ducts.len()
        );
    }
    ducts
}
