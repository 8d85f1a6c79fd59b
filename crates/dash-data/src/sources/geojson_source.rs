//! GeoJSON feature collections as tables

use dash_core::{GeoFeatureCollection, Row, TabularResult, Value};
use indexmap::IndexSet;

use crate::DataError;

/// Parse a payload that must carry both `type` and a `features` array
pub fn parse_feature_collection(bytes: &[u8]) -> Result<GeoFeatureCollection, DataError> {
    serde_json::from_slice(bytes).map_err(|e| DataError::InvalidGeoJson(e.to_string()))
}

/// One row per feature holding its properties; the collection is attached
/// to the table so features and rows stay index-aligned
pub fn feature_table(collection: GeoFeatureCollection) -> Result<TabularResult, DataError> {
    let mut headers: IndexSet<String> = IndexSet::new();
    for feature in &collection.features {
        if let Some(properties) = &feature.properties {
            headers.extend(properties.keys().cloned());
        }
    }

    let headers: Vec<String> = headers.into_iter().collect();
    let rows = collection
        .features
        .iter()
        .map(|feature| {
            headers
                .iter()
                .map(|h| (h.clone(), feature.property(h).map(Value::from).unwrap_or(Value::Null)))
                .collect::<Row>()
        })
        .collect();

    let mut table = TabularResult::from_rows(headers, rows)?;
    table.geometry = Some(collection);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_features_rejected() {
        let err = parse_feature_collection(br#"{"type": "FeatureCollection"}"#).unwrap_err();
        assert!(matches!(err, DataError::InvalidGeoJson(_)));
        let err = parse_feature_collection(br#"{"features": []}"#).unwrap_err();
        assert!(matches!(err, DataError::InvalidGeoJson(_)));
    }

    #[test]
    fn test_feature_table_rows_follow_features() {
        let json = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": null, "properties": {"name": "a"}},
                {"type": "Feature", "geometry": null, "properties": null},
                {"type": "Feature", "geometry": null, "properties": {"pop": 12}}
            ]
        }"#;
        let table = feature_table(parse_feature_collection(json).unwrap()).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.headers(), &["name".to_string(), "pop".to_string()][..]);
        assert_eq!(table.rows()[1]["name"], Value::Null);
        assert_eq!(table.rows()[2]["pop"], Value::Number(12.0));
        assert_eq!(table.geometry.as_ref().map(|g| g.len()), Some(3));
    }

    #[test]
    fn test_property_columns_keep_document_order() {
        let json = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": null, "properties": {"tract": "000100", "pop": 12, "area": 3}},
                {"type": "Feature", "geometry": null, "properties": {"zone": "b", "pop": 7}}
            ]
        }"#;
        let table = feature_table(parse_feature_collection(json).unwrap()).unwrap();
        assert_eq!(
            table.headers(),
            &["tract", "pop", "area", "zone"].map(String::from)[..]
        );
        let keys: Vec<&String> = table.rows()[0].keys().collect();
        assert_eq!(keys, ["tract", "pop", "area", "zone"]);
    }
}
