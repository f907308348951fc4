//! Shapefile loading.

use std::path::Path;

use shapefile::dbase::{FieldValue, Record};
use shapefile::{Point, PointM, PointZ, Shape};
use tracing::debug;

use crate::error::{Result, ZonalError};
use crate::geometry::{Feature, Geometry};
use crate::types::Geography;

/// Read every feature of a shapefile with its label.
///
/// Labels come from `label_field` when given, otherwise from the first of
/// the geography's candidate fields that a record carries. `Custom`
/// geographies fall back to the alphabetically first text field.
pub fn load_features(
    path: &Path,
    geography: Geography,
    label_field: Option<&str>,
) -> Result<Vec<Feature>> {
    let shapefile_error = |e: shapefile::Error| ZonalError::Shapefile {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut reader = shapefile::Reader::from_path(path).map_err(shapefile_error)?;
    let candidates: Vec<&str> = match label_field {
        Some(field) => vec![field],
        None => geography.label_fields().to_vec(),
    };

    let mut features = Vec::new();
    for (index, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.map_err(shapefile_error)?;

        let Some(geometry) = to_geometry(shape)? else {
            debug!(index, "Skipping null shape");
            continue;
        };

        let fallback = label_field.is_none() && geography == Geography::Custom;
        let label = find_label(record, &candidates, fallback).ok_or_else(|| {
            ZonalError::MissingLabel {
                path: path.display().to_string(),
                index,
                candidates: candidates.join(", "),
            }
        })?;

        features.push(Feature::new(label, geometry));
    }

    debug!(path = %path.display(), count = features.len(), "Loaded features");
    Ok(features)
}

fn to_geometry(shape: Shape) -> Result<Option<Geometry>> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(Point { x, y, .. }) => Geometry::Point(x, y),
        Shape::PointM(PointM { x, y, .. }) => Geometry::Point(x, y),
        Shape::PointZ(PointZ { x, y, .. }) => Geometry::Point(x, y),
        Shape::Polygon(polygon) => Geometry::Polygon(
            polygon
                .rings()
                .iter()
                .map(|ring| ring.points().iter().map(|p| (p.x, p.y)).collect())
                .collect(),
        ),
        Shape::PolygonM(polygon) => Geometry::Polygon(
            polygon
                .rings()
                .iter()
                .map(|ring| ring.points().iter().map(|p| (p.x, p.y)).collect())
                .collect(),
        ),
        Shape::PolygonZ(polygon) => Geometry::Polygon(
            polygon
                .rings()
                .iter()
                .map(|ring| ring.points().iter().map(|p| (p.x, p.y)).collect())
                .collect(),
        ),
        other => return Err(ZonalError::UnsupportedShape(format!("{:?}", other.shapetype()))),
    };
    Ok(Some(geometry))
}

fn find_label(record: Record, candidates: &[&str], fallback: bool) -> Option<String> {
    for name in candidates {
        if let Some(label) = record.get(name).and_then(label_value) {
            return Some(label);
        }
    }

    if !fallback {
        return None;
    }

    let mut text_fields: Vec<(String, String)> = record
        .into_iter()
        .filter_map(|(name, value)| match value {
            FieldValue::Character(Some(s)) => Some((name, s.trim().to_string())),
            _ => None,
        })
        .collect();
    text_fields.sort();
    text_fields.into_iter().map(|(_, value)| value).next()
}

/// Render an attribute value as a label. Integral numbers lose the
/// trailing `.0` so numeric codes read like their text form.
fn label_value(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(Some(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        FieldValue::Numeric(Some(n)) => Some(format_number(*n)),
        FieldValue::Float(Some(n)) => Some(format_number(f64::from(*n))),
        FieldValue::Double(n) => Some(format_number(*n)),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
