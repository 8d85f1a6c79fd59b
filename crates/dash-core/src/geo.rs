//! GeoJSON feature collection model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A `FeatureCollection`; unknown top-level members are kept in `extra`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<GeoFeature>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFeature {
    #[serde(rename = "type", default = "default_feature_kind")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<JsonValue>,
    #[serde(default)]
    pub properties: Option<Map<String, JsonValue>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_feature_kind() -> String {
    "Feature".to_string()
}

impl GeoFeature {
    /// The geometry `type` member, if any
    pub fn geometry_type(&self) -> Option<&str> {
        self.geometry.as_ref()?.get("type")?.as_str()
    }

    /// Properties, created empty if the feature had none
    pub fn properties_mut(&mut self) -> &mut Map<String, JsonValue> {
        self.properties.get_or_insert_with(Map::new)
    }

    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.as_ref()?.get(key)
    }
}

impl GeoFeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
