//! Geographic enrichment of GeoJSON-backed tables

use dash_core::{TabularResult, Value};
use serde_json::Value as JsonValue;

use crate::config::LoadOptions;
use crate::DataError;

pub const FEATURE_ID_COLUMN: &str = "feature_id";
pub const AREA_COLUMN: &str = "computed_area";

/// Planar polygon area of a vertex ring (shoelace formula)
///
/// An open ring is closed implicitly. Coordinates are treated as planar, so
/// lon/lat input gives square degrees, not a geodesic area.
pub fn shoelace_area(ring: &[(f64, f64)]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let twice_area: f64 = ring
        .iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(&(x1, y1), &(x2, y2))| x1 * y2 - x2 * y1)
        .sum();
    twice_area.abs() / 2.0
}

fn ring_points(ring: &JsonValue) -> Option<Vec<(f64, f64)>> {
    ring.as_array()?
        .iter()
        .map(|point| Some((point.get(0)?.as_f64()?, point.get(1)?.as_f64()?)))
        .collect()
}

/// Area from the first ring of a `Polygon`, or the sum of the first rings
/// of each `MultiPolygon` member; `None` for other geometry types
pub fn polygon_area(geometry: &JsonValue) -> Option<f64> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => ring_points(coordinates.get(0)?).map(|ring| shoelace_area(&ring)),
        "MultiPolygon" => Some(
            coordinates
                .as_array()?
                .iter()
                .filter_map(|polygon| ring_points(polygon.get(0)?))
                .map(|ring| shoelace_area(&ring))
                .sum(),
        ),
        _ => None,
    }
}

/// Give every feature a `feature_id` and polygons a `computed_area`
///
/// Both are written to the feature properties and to the matching row.
pub fn process(mut table: TabularResult, _options: &LoadOptions) -> Result<TabularResult, DataError> {
    let Some(mut collection) = table.geometry.take() else {
        return Err(DataError::InvalidGeoJson(
            "table has no feature collection attached".to_string(),
        ));
    };
    if collection.len() != table.row_count() {
        return Err(DataError::InvalidGeoJson(format!(
            "{} features for {} rows",
            collection.len(),
            table.row_count()
        )));
    }

    let mut areas = Vec::with_capacity(collection.len());
    for (idx, feature) in collection.features.iter_mut().enumerate() {
        let area = feature.geometry.as_ref().and_then(polygon_area);
        let properties = feature.properties_mut();
        properties.insert(FEATURE_ID_COLUMN.to_string(), JsonValue::from(idx));
        if let Some(area) = area {
            properties.insert(AREA_COLUMN.to_string(), JsonValue::from(area));
        }
        areas.push(area);
    }

    let mut enriched = table.map_rows([FEATURE_ID_COLUMN, AREA_COLUMN], |idx, row| {
        row.insert(FEATURE_ID_COLUMN.to_string(), Value::from(idx));
        row.insert(AREA_COLUMN.to_string(), Value::from(areas[idx]));
    })?;
    enriched.geometry = Some(collection);
    Ok(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{feature_table, parse_feature_collection};
    use serde_json::json;

    #[test]
    fn test_square_area() {
        let square = [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)];
        assert_eq!(shoelace_area(&square), 4.0);
        // open rings close implicitly
        assert_eq!(shoelace_area(&square[..4]), 4.0);
        assert_eq!(shoelace_area(&square[..2]), 0.0);
    }

    #[test]
    fn test_polygon_area_by_type() {
        let polygon = json!({"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]});
        assert_eq!(polygon_area(&polygon), Some(4.0));

        let multi = json!({"type": "MultiPolygon", "coordinates": [
            [[[0,0],[1,0],[1,1],[0,1],[0,0]]],
            [[[5,5],[7,5],[7,7],[5,7],[5,5]]]
        ]});
        assert_eq!(polygon_area(&multi), Some(5.0));

        let point = json!({"type": "Point", "coordinates": [1, 2]});
        assert_eq!(polygon_area(&point), None);
    }

    #[test]
    fn test_process_enriches_rows_and_features() {
        let payload = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "tract"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]}},
                {"type": "Feature", "properties": {"name": "school"},
                 "geometry": {"type": "Point", "coordinates": [1, 1]}}
            ]
        });
        let bytes = serde_json::to_vec(&payload).unwrap();
        let table = feature_table(parse_feature_collection(&bytes).unwrap()).unwrap();
        let out = process(table, &LoadOptions::default()).unwrap();

        assert_eq!(out.rows()[0][FEATURE_ID_COLUMN], Value::Number(0.0));
        assert_eq!(out.rows()[0][AREA_COLUMN], Value::Number(4.0));
        assert_eq!(out.rows()[1][FEATURE_ID_COLUMN], Value::Number(1.0));
        assert_eq!(out.rows()[1][AREA_COLUMN], Value::Null);

        let features = &out.geometry.as_ref().unwrap().features;
        assert_eq!(features[0].property(AREA_COLUMN), Some(&json!(4.0)));
        assert_eq!(features[1].property(FEATURE_ID_COLUMN), Some(&json!(1)));
        assert_eq!(features[1].property(AREA_COLUMN), None);
    }

    #[test]
    fn test_process_requires_geometry() {
        let table = TabularResult::new(vec!["a".to_string()]).unwrap();
        let err = process(table, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DataError::InvalidGeoJson(_)));
    }
}
