//! Typed view over a plant.id identification response.

use serde::Serialize;
use serde_json::Value;

/// One candidate species.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub name: String,
    pub probability: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub common_names: Vec<String>,
}

/// Plant probability plus suggestions, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identification {
    pub is_plant: Option<f64>,
    pub suggestions: Vec<Suggestion>,
}

impl Identification {
    /// Read `result.is_plant.probability` and
    /// `result.classification.suggestions[]`. Missing pieces stay empty.
    #[must_use]
    pub fn from_response(json: &Value) -> Self {
        let result = &json["result"];
        let is_plant = result["is_plant"]["probability"].as_f64();

        let mut suggestions: Vec<Suggestion> = result["classification"]["suggestions"]
            .as_array()
            .map(|items| items.iter().filter_map(parse_suggestion).collect())
            .unwrap_or_default();
        suggestions.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        Self { is_plant, suggestions }
    }

    #[must_use]
    pub fn top(&self) -> Option<&Suggestion> {
        self.suggestions.first()
    }

    /// Top suggestion's probability as a whole percentage, the unit
    /// `plants.identification_confidence` uses.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn top_confidence_percent(&self) -> Option<i32> {
        self.top().map(|s| (s.probability.clamp(0.0, 1.0) * 100.0).round() as i32)
    }
}

fn parse_suggestion(item: &Value) -> Option<Suggestion> {
    let name = item["name"].as_str()?.to_string();
    let probability = item["probability"].as_f64().unwrap_or(0.0);
    let common_names = item["details"]["common_names"]
        .as_array()
        .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    Some(Suggestion { name, probability, common_names })
}
