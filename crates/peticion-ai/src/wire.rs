//! Spanish-keyed JSON exchanged with the model, and its validation.
//!
//! Models drift from the requested schema: numbers arrive as strings, lists
//! as comma-joined text, arrays wrapped in an object. Decoding is lenient per
//! field. Validation then decides what is usable: a record missing its
//! required fields is dropped, and a list is accepted if at least one record
//! survives.

use chrono::NaiveDate;
use peticion_core::types::fold_label;
use peticion_core::{AnalysisResult, Level, Problem, ProblemCategory, Recommendation};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Why a decoded value could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("expected a JSON array")]
    NotAList,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("none of {0} elements were well-formed")]
    NoValidElements(usize),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireAnalysis {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tipo_documento: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub longitud: Option<u64>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub palabras_clave: Vec<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub confianza: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub analisis_markdown: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireProblem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub tipo: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub descripcion: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub severidad: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub linea: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fundamento_legal: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub impacto: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recomendacion_breve: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireRecommendation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub titulo: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub descripcion: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub prioridad: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub accion: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fundamento_legal: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tiempo_estimado: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recursos_necesarios: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub impacto_esperado: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub riesgos: String,
}

// ── Lenient field decoding ──

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(items) => items
            .into_iter()
            .map(scalar_to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(scalar_to_string(Value::deserialize(de)?).trim().to_string())
}

fn lenient_strings<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    let items = match Value::deserialize(de)? {
        Value::Array(items) => items.into_iter().map(scalar_to_string).collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn lenient_number<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite()))
}

fn lenient_count<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

// ── Validation ──

/// Normalize a confidence to `[0, 1]`. Values in `(1, 100]` are read as percentages.
pub fn clamp_confidence(raw: Option<f64>, default: f64) -> f64 {
    match raw {
        Some(c) if c > 1.0 && c <= 100.0 => c / 100.0,
        Some(c) => c.clamp(0.0, 1.0),
        None => default,
    }
}

/// Confidence used when the model omits it.
const DEFAULT_CONFIDENCE: f64 = 0.5;

impl WireAnalysis {
    /// Convert into a domain result for `document`.
    ///
    /// `length` is always the real character count of the document.
    pub fn into_result(self, document: &str, today: NaiveDate) -> Result<AnalysisResult, ShapeError> {
        if self.tipo_documento.is_empty() {
            return Err(ShapeError::MissingField("tipo_documento"));
        }
        Ok(AnalysisResult {
            document_type: self.tipo_documento,
            length: document.chars().count(),
            confidence: clamp_confidence(self.confianza, DEFAULT_CONFIDENCE),
            keywords: self.palabras_clave,
            analysis_date: today,
            narrative: self.analisis_markdown,
        })
    }
}

impl WireProblem {
    pub fn into_problem(self) -> Result<Problem, ShapeError> {
        if self.tipo.is_empty() {
            return Err(ShapeError::MissingField("tipo"));
        }
        if self.descripcion.is_empty() {
            return Err(ShapeError::MissingField("descripcion"));
        }
        Ok(Problem {
            category: ProblemCategory::parse(&self.tipo),
            description: self.descripcion,
            severity: Level::parse(&self.severidad).unwrap_or(Level::Medium),
            line: if self.linea.is_empty() {
                "N/A".into()
            } else {
                self.linea
            },
            legal_basis: self.fundamento_legal,
            impact: self.impacto,
            short_recommendation: self.recomendacion_breve,
        })
    }
}

impl WireRecommendation {
    pub fn into_recommendation(self) -> Result<Recommendation, ShapeError> {
        if self.titulo.is_empty() {
            return Err(ShapeError::MissingField("titulo"));
        }
        Ok(Recommendation {
            title: self.titulo,
            description: self.descripcion,
            priority: Level::parse(&self.prioridad).unwrap_or(Level::Medium),
            action: self.accion,
            legal_basis: self.fundamento_legal,
            estimated_time: self.tiempo_estimado,
            resources_needed: self.recursos_necesarios,
            expected_impact: self.impacto_esperado,
            risks: self.riesgos,
        })
    }
}

/// Decode an analysis object.
pub fn analysis_from_value(
    value: Value,
    document: &str,
    today: NaiveDate,
) -> Result<AnalysisResult, ShapeError> {
    if !value.is_object() {
        return Err(ShapeError::NotAnObject);
    }
    let wire: WireAnalysis =
        serde_json::from_value(value).map_err(|_| ShapeError::MissingField("tipo_documento"))?;
    wire.into_result(document, today)
}

/// Find the list in a response: a bare array, an array under a known key, or a lone record.
fn list_items(value: Value, keys: &[&str]) -> Result<Vec<Value>, ShapeError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            let wrapped = map.keys().find(|k| keys.contains(&fold_label(k).as_str())).cloned();
            match wrapped.and_then(|k| map.remove(&k)) {
                Some(Value::Array(items)) => Ok(items),
                Some(_) => Err(ShapeError::NotAList),
                None => Ok(vec![Value::Object(map)]),
            }
        }
        _ => Err(ShapeError::NotAList),
    }
}

fn filter_valid<W, T>(
    items: Vec<Value>,
    convert: impl Fn(W) -> Result<T, ShapeError>,
) -> Result<Vec<T>, ShapeError>
where
    W: for<'de> Deserialize<'de>,
{
    let total = items.len();
    let valid: Vec<T> = items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value::<W>(item).ok())
        .filter_map(|wire| convert(wire).ok())
        .collect();
    if valid.is_empty() {
        return Err(ShapeError::NoValidElements(total));
    }
    Ok(valid)
}

/// Decode a problem list, dropping malformed entries. An empty list is rejected.
pub fn problems_from_value(value: Value) -> Result<Vec<Problem>, ShapeError> {
    let items = list_items(value, &["PROBLEMAS", "PROBLEMS"])?;
    filter_valid(items, WireProblem::into_problem)
}

/// Decode a recommendation list, dropping malformed entries.
pub fn recommendations_from_value(value: Value) -> Result<Vec<Recommendation>, ShapeError> {
    let items = list_items(value, &["RECOMENDACIONES", "RECOMMENDATIONS"])?;
    filter_valid(items, WireRecommendation::into_recommendation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn analysis_uses_real_length() {
        let value = json!({"tipo_documento": "X", "longitud": 999, "palabras_clave": ["a"],
                           "confianza": 0.9, "analisis_markdown": "y"});
        let result = analysis_from_value(value, "0123456789", today()).unwrap();
        assert_eq!(result.document_type, "X");
        assert_eq!(result.length, 10);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.keywords, vec!["a"]);
        assert_eq!(result.narrative, "y");
    }

    #[test]
    fn analysis_coerces_loose_fields() {
        let value = json!({"tipo_documento": "Recurso", "palabras_clave": "ley, decreto ,",
                           "confianza": "85%"});
        let result = analysis_from_value(value, "ñandú", today()).unwrap();
        assert_eq!(result.length, 5);
        assert_eq!(result.keywords, vec!["ley", "decreto"]);
        assert!((result.confidence - 0.85).abs() < 1e-9);
        assert_eq!(result.narrative, "");
    }

    #[test]
    fn analysis_requires_document_type() {
        assert_eq!(
            analysis_from_value(json!({"confianza": 0.4}), "", today()).unwrap_err(),
            ShapeError::MissingField("tipo_documento")
        );
        assert_eq!(
            analysis_from_value(json!([1]), "", today()).unwrap_err(),
            ShapeError::NotAnObject
        );
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(clamp_confidence(Some(-0.3), 0.5), 0.0);
        assert_eq!(clamp_confidence(Some(1.0), 0.5), 1.0);
        assert_eq!(clamp_confidence(Some(75.0), 0.5), 0.75);
        assert_eq!(clamp_confidence(Some(400.0), 0.5), 1.0);
        assert_eq!(clamp_confidence(None, 0.5), 0.5);
    }

    #[test]
    fn problems_keep_valid_entries_only() {
        let value = json!([
            {"tipo": "FORMAL", "descripcion": "Sin fecha", "severidad": "ALTA (grave)"},
            {"tipo": "SUSTANCIAL"},
            "texto suelto",
            {"tipo": "CONSTITUCIONAL", "descripcion": "Debido proceso", "severidad": "urgente"}
        ]);
        let problems = problems_from_value(value).unwrap();
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].category, ProblemCategory::Formal);
        assert_eq!(problems[0].severity, Level::High);
        assert_eq!(problems[0].line, "N/A");
        assert_eq!(problems[1].severity, Level::Medium);
    }

    #[test]
    fn problems_unwrap_keyed_object() {
        let value = json!({"problemas": [{"tipo": "LEGAL", "descripcion": "d"}]});
        assert_eq!(problems_from_value(value).unwrap()[0].category, ProblemCategory::Legal);
    }

    #[test]
    fn single_problem_object_is_a_list_of_one() {
        let value = json!({"tipo": "FORMAL", "descripcion": "d", "linea": 12});
        let problems = problems_from_value(value).unwrap();
        assert_eq!(problems[0].line, "12");
    }

    #[test]
    fn no_valid_problem_is_an_error() {
        assert_eq!(
            problems_from_value(json!([{"x": 1}, 2])).unwrap_err(),
            ShapeError::NoValidElements(2)
        );
        assert_eq!(
            recommendations_from_value(json!([])).unwrap_err(),
            ShapeError::NoValidElements(0)
        );
        assert_eq!(problems_from_value(json!("s")).unwrap_err(), ShapeError::NotAList);
    }

    #[test]
    fn empty_problem_list_is_rejected() {
        assert_eq!(
            problems_from_value(json!([])).unwrap_err(),
            ShapeError::NoValidElements(0)
        );
        assert_eq!(
            problems_from_value(json!({"problemas": []})).unwrap_err(),
            ShapeError::NoValidElements(0)
        );
    }

    #[test]
    fn recommendations_require_title() {
        let value = json!({"recomendaciones": [
            {"titulo": "Citar Ley 1755", "prioridad": "baja", "fundamento_legal": ["Art. 23 C.P.", "Ley 1755"]},
            {"descripcion": "sin título"}
        ]});
        let recs = recommendations_from_value(value).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Level::Low);
        assert_eq!(recs[0].legal_basis, "Art. 23 C.P.; Ley 1755");
    }
}
