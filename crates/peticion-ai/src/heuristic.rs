//! Local rule-based analyzer.
//!
//! Works with no network and no keys. It inspects keywords and structure and
//! answers in the same JSON the remote model is asked for, so its output goes
//! through the same validation path.

use async_trait::async_trait;
use peticion_core::types::fold_label;
use peticion_core::{AnalysisResult, ChatContext, Level, Problem, ProblemCategory};
use tracing::debug;

use crate::client::ModelClient;
use crate::error::ClientError;
use crate::fallback;
use crate::wire::{WireAnalysis, WireProblem, WireRecommendation};

/// Always-available client backed by keyword rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClient;

impl HeuristicClient {
    pub fn new() -> Self {
        Self
    }
}

/// Folded text plus the counts the rules look at.
struct Scan {
    folded: String,
    chars: usize,
    words: usize,
    paragraphs: usize,
    sentences: usize,
}

impl Scan {
    fn new(text: &str) -> Self {
        Self {
            folded: fold_label(text),
            chars: text.chars().count(),
            words: text.split_whitespace().count(),
            paragraphs: text.matches("\n\n").count() + 1,
            sentences: text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count(),
        }
    }

    fn has(&self, needle: &str) -> bool {
        self.folded.contains(needle)
    }

    fn has_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.has(n))
    }

    fn is_negative_answer(&self) -> bool {
        self.has_any(&["NO PROCEDE", "NO SE ACCEDE", "SE NIEGA"])
    }
}

fn document_type(scan: &Scan) -> &'static str {
    if scan.has("PETICION") {
        "Derecho de Petición"
    } else if scan.has_any(&["RECURSO", "APELACION", "RECONSIDERACION"]) {
        "Recurso Administrativo"
    } else if scan.has_any(&["ACTO ADMINISTRATIVO", "RESOLUCION", "DECRETO"]) {
        "Acto Administrativo"
    } else if scan.has_any(&["CONTRATO", "CONVENIO", "ACUERDO"]) {
        "Contrato o Convenio"
    } else {
        "Documento Administrativo"
    }
}

fn quality(scan: &Scan) -> (&'static str, f64) {
    if scan.chars > 1500 && scan.paragraphs > 5 && scan.sentences > 10 {
        ("ALTA", 0.9)
    } else if scan.chars > 800 && scan.paragraphs > 3 && scan.sentences > 5 {
        ("MEDIA", 0.7)
    } else if scan.chars < 300 {
        ("BAJA", 0.3)
    } else {
        ("MEDIA", 0.5)
    }
}

const KEYWORD_RULES: [(&[&str], &str); 8] = [
    (&["CONSTITUCION"], "Constitución Política"),
    (&["LEY"], "Normativa Legal"),
    (&["DECRETO"], "Decreto"),
    (&["RESOLUCION"], "Resolución"),
    (&["COMPETENCIA", "COMPETENTE"], "Competencia Administrativa"),
    (&["FUNDAMENTO", "FUNDAMENTACION"], "Fundamentación Legal"),
    (&["DERECHO"], "Derechos"),
    (&["PROCEDIMIENTO"], "Procedimiento"),
];

fn keywords(scan: &Scan) -> Vec<String> {
    let found: Vec<String> = KEYWORD_RULES
        .iter()
        .filter(|(needles, _)| scan.has_any(needles))
        .map(|(_, label)| label.to_string())
        .collect();
    if found.is_empty() {
        ["Administrativo", "Legal", "Procedimiento", "Documento"]
            .map(String::from)
            .to_vec()
    } else {
        found
    }
}

fn structure(scan: &Scan) -> &'static str {
    if scan.has_any(&["CONCLUSION", "RESUELVE"]) {
        "COMPLETA"
    } else if scan.has_any(&["ARTICULO", "FUNDAMENTO"]) {
        "FUNDAMENTADA"
    } else if scan.has_any(&["ENCABEZADO", "FECHA"]) {
        "FORMAL"
    } else {
        "BÁSICA"
    }
}

/// Analyze `text` into the wire shape.
pub fn analyze(text: &str) -> WireAnalysis {
    let scan = Scan::new(text);
    let kind = document_type(&scan);
    let (quality, confidence) = quality(&scan);
    let narrative = format!(
        "## Análisis del Documento\n\n\
         Documento de {chars} caracteres con {paragraphs} párrafos y {sentences} oraciones.\n\n\
         ### Observaciones\n\
         - **Tipo identificado**: {kind}\n\
         - **Calidad**: {quality}\n\
         - **Estructura**: {structure}\n\
         - **Palabras**: {words}\n\n\
         *Análisis local basado en reglas. Configure un proveedor de IA para un análisis detallado.*",
        chars = scan.chars,
        paragraphs = scan.paragraphs,
        sentences = scan.sentences,
        structure = structure(&scan),
        words = scan.words,
    );
    WireAnalysis {
        tipo_documento: kind.into(),
        longitud: Some(scan.chars as u64),
        palabras_clave: keywords(&scan),
        confianza: Some(confidence),
        analisis_markdown: narrative,
    }
}

fn wire_problem(
    category: ProblemCategory,
    description: &str,
    severity: Level,
    legal_basis: &str,
    impact: &str,
    short_recommendation: &str,
) -> WireProblem {
    WireProblem {
        tipo: category.spanish_label().into(),
        descripcion: description.into(),
        severidad: severity.spanish_label().into(),
        linea: "N/A".into(),
        fundamento_legal: legal_basis.into(),
        impacto: impact.into(),
        recomendacion_breve: short_recommendation.into(),
    }
}

/// Words in a sentence above which it reads as too long.
const LONG_SENTENCE_WORDS: usize = 30;

/// Detect problems in `text` into the wire shape. Never empty: a clean
/// document yields a single low-severity review entry.
pub fn detect_problems(text: &str) -> Vec<WireProblem> {
    let scan = Scan::new(text);
    let mut found = Vec::new();

    if scan.chars < 200 {
        found.push(wire_problem(
            ProblemCategory::Structural,
            "Documento muy corto, puede carecer de fundamentación adecuada",
            Level::Medium,
            "Ley 1437 de 2011 - Principio de motivación",
            "Respuesta insuficiente para el ciudadano, puede generar recursos",
            "Expandir la respuesta con más detalles y fundamentación",
        ));
    }

    if !scan.has_any(&["FUNDAMENT", "ARTICULO", "LEY", "DECRETO", "CONSTITUCION"]) {
        found.push(wire_problem(
            ProblemCategory::Legal,
            "Falta fundamentación legal específica y citas de normas",
            Level::High,
            "Constitución Art. 23, Ley 1437 Art. 6, Ley 1755 de 2015",
            "Puede llevar a nulidad del documento y recursos de apelación",
            "Agregar citas específicas de normas aplicables y fundamentación legal",
        ));
    }

    if !scan.has_any(&["COMPETENTE", "COMPETENCIA", "FUNCIONARIO", "AUTORIDAD", "DELEGA"]) {
        found.push(wire_problem(
            ProblemCategory::Administrative,
            "No se especifica la competencia del funcionario o autoridad",
            Level::Medium,
            "Ley 1437 de 2011 - Principio de competencia",
            "Duda sobre la autoridad para resolver, puede generar impugnación",
            "Especificar competencia del funcionario y fundamento legal",
        ));
    }

    if !scan.has_any(&["ENCABEZADO", "FECHA", "NUMERO", "RADICADO", "REFERENCIA"]) {
        found.push(wire_problem(
            ProblemCategory::Formal,
            "Falta estructura formal del documento (encabezado, fecha, número de radicado)",
            Level::Medium,
            "Ley 1437 de 2011 - Principio de formalidad",
            "Dificulta el seguimiento y control administrativo",
            "Agregar encabezado formal con datos de identificación",
        ));
    }

    if scan.words > 50 {
        let long_sentences = text
            .split('.')
            .filter(|s| s.split_whitespace().count() > LONG_SENTENCE_WORDS)
            .count();
        if long_sentences > 2 {
            found.push(wire_problem(
                ProblemCategory::Communication,
                "Presencia de oraciones muy largas que dificultan la comprensión",
                Level::Low,
                "Ley 1755 de 2015 - Derecho de acceso a la información",
                "Dificulta la comprensión del ciudadano",
                "Simplificar oraciones largas y usar párrafos cortos",
            ));
        }
    }

    if scan.chars < 1000
        && scan.has_any(&["COMPETENCIA", "FUNDAMENTO", "MOTIVACION", "RECURSO", "APELACION"])
    {
        found.push(wire_problem(
            ProblemCategory::Communication,
            "Uso de términos técnicos sin explicación adecuada",
            Level::Low,
            "Ley 1755 de 2015 - Principio de claridad",
            "Puede confundir al ciudadano",
            "Explicar términos técnicos o usar lenguaje más simple",
        ));
    }

    if scan.is_negative_answer() && !scan.has_any(&["FUNDAMENTO", "MOTIVO"]) {
        found.push(wire_problem(
            ProblemCategory::Legal,
            "Respuesta negativa sin fundamentación legal clara",
            Level::High,
            "Ley 1437 de 2011 - Principio de motivación",
            "Respuesta puede ser impugnada por falta de fundamentación",
            "Fundamentar claramente la respuesta negativa con normas aplicables",
        ));
    }

    if scan.has("DERECHO DE PETICION") && !scan.has_any(&["15 DIAS", "QUINCE DIAS"]) {
        found.push(wire_problem(
            ProblemCategory::Procedural,
            "No se especifica el término de respuesta (15 días hábiles)",
            Level::Medium,
            "Constitución Art. 23, Ley 1437 de 2011",
            "Dificulta al ciudadano conocer sus derechos",
            "Especificar el término de respuesta según la normativa",
        ));
    }

    if found.is_empty() {
        found.push(wire_problem(
            ProblemCategory::Other(CLEAN_REVIEW_CATEGORY.into()),
            "No se detectaron problemas significativos; conviene una revisión final antes de radicar",
            Level::Low,
            "Ley 1755 de 2015",
            "Sin impacto previsible sobre la validez del documento",
            "Releer el documento completo y verificar datos de notificación",
        ));
    }

    found
}

/// Category of the entry reported for a document with no detected problems.
const CLEAN_REVIEW_CATEGORY: &str = "REVISIÓN GENERAL";

fn wire_rec(
    title: &str,
    description: &str,
    priority: Level,
    estimated_time: &str,
    resources_needed: &str,
    expected_impact: &str,
    risks: &str,
) -> WireRecommendation {
    WireRecommendation {
        titulo: title.into(),
        descripcion: description.into(),
        prioridad: priority.spanish_label().into(),
        accion: description.into(),
        fundamento_legal: String::new(),
        tiempo_estimado: estimated_time.into(),
        recursos_necesarios: resources_needed.into(),
        impacto_esperado: expected_impact.into(),
        riesgos: risks.into(),
    }
}

fn recommendation_for(category: &ProblemCategory) -> Option<WireRecommendation> {
    let rec = match category {
        ProblemCategory::Legal => wire_rec(
            "Agregar fundamentación legal completa",
            "Incluir citas específicas de la Constitución Política, Ley 1437 de 2011 y normativa aplicable al caso",
            Level::High,
            "inmediato",
            "Consulta de normativa vigente, asesoría legal especializada",
            "Documento jurídicamente válido, reducción de recursos de apelación",
            "Verificar vigencia de normas citadas, consultar jurisprudencia aplicable",
        ),
        ProblemCategory::Structural => wire_rec(
            "Mejorar estructura y organización del documento",
            "Reorganizar en secciones claras con encabezados, numeración y párrafos bien definidos",
            Level::Medium,
            "corto plazo",
            "Revisión de formato, herramientas de procesamiento de texto",
            "Mejor comprensión del ciudadano, documento más profesional",
            "Mantener coherencia del contenido durante la reorganización",
        ),
        ProblemCategory::Administrative => wire_rec(
            "Especificar competencia administrativa",
            "Clarificar la autoridad del funcionario para resolver, incluir fundamento legal de la competencia",
            Level::Medium,
            "inmediato",
            "Verificación de funciones, consulta de manual de funciones",
            "Legitimidad del acto administrativo, claridad para el ciudadano",
            "Verificar delegación de funciones y límites de competencia",
        ),
        ProblemCategory::Formal => wire_rec(
            "Implementar estructura formal completa",
            "Agregar encabezado con datos de la entidad, fecha, número de radicado y referencia",
            Level::Medium,
            "inmediato",
            "Plantilla de documento, verificación de datos institucionales",
            "Documento profesional, mejor seguimiento administrativo",
            "Verificar exactitud de datos institucionales",
        ),
        ProblemCategory::Communication => wire_rec(
            "Mejorar claridad y accesibilidad del lenguaje",
            "Simplificar oraciones largas, explicar términos técnicos, usar lenguaje ciudadano",
            Level::Low,
            "corto plazo",
            "Revisión de redacción, consulta de guías de lenguaje claro",
            "Mejor comprensión del ciudadano, cumplimiento del derecho de acceso a la información",
            "Mantener precisión técnica mientras se simplifica el lenguaje",
        ),
        ProblemCategory::Procedural => wire_rec(
            "Especificar términos y procedimientos",
            "Indicar claramente el término de respuesta (15 días hábiles) y vías de recurso disponibles",
            Level::Medium,
            "inmediato",
            "Verificación de términos legales, consulta de procedimientos",
            "Claridad para el ciudadano, cumplimiento de términos legales",
            "Verificar exactitud de términos según normativa aplicable",
        ),
        _ => return None,
    };
    Some(rec)
}

/// Recommendations for `problems` in `text`. Never empty.
pub fn generate_recommendations(text: &str, problems: &[Problem]) -> Vec<WireRecommendation> {
    let scan = Scan::new(text);
    let mut out = Vec::new();

    for problem in problems {
        out.extend(recommendation_for(&problem.category));
        if problem.category == ProblemCategory::Legal && scan.is_negative_answer() {
            out.push(wire_rec(
                "Fundamentar respuesta negativa",
                "Explicar claramente los motivos legales de la negativa con citas específicas",
                Level::High,
                "inmediato",
                "Análisis legal del caso, identificación de excepciones aplicables",
                "Respuesta sólida ante impugnaciones, cumplimiento del principio de motivación",
                "Verificar que la negativa esté legalmente justificada",
            ));
        }
    }

    if scan.chars < 500 {
        out.push(wire_rec(
            "Expandir contenido del documento",
            "Desarrollar más detalladamente la respuesta, incluir ejemplos y casos similares",
            Level::Medium,
            "corto plazo",
            "Investigación adicional del caso, consulta de precedentes",
            "Respuesta más completa y útil para el ciudadano",
            "Mantener relevancia y no agregar información innecesaria",
        ));
    }

    out.push(wire_rec(
        "Revisión integral de calidad",
        "Verificar cumplimiento de estándares administrativos, legales y de comunicación",
        Level::Low,
        "corto plazo",
        "Revisión técnica integral, validación legal",
        "Documento de alta calidad, cumplimiento de todos los estándares",
        "Mínimos, solo tiempo de revisión",
    ));
    out
}

#[async_trait]
impl ModelClient for HeuristicClient {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn analyze(&self, text: &str) -> Result<String, ClientError> {
        debug!(chars = text.len(), "heuristic analysis");
        Ok(serde_json::to_string(&analyze(text))?)
    }

    async fn detect_problems(
        &self,
        text: &str,
        _analysis: &AnalysisResult,
    ) -> Result<String, ClientError> {
        Ok(serde_json::to_string(&detect_problems(text))?)
    }

    async fn generate_recommendations(
        &self,
        text: &str,
        problems: &[Problem],
    ) -> Result<String, ClientError> {
        Ok(serde_json::to_string(&generate_recommendations(text, problems))?)
    }

    async fn chat(&self, question: &str, context: &ChatContext<'_>) -> Result<String, ClientError> {
        Ok(fallback::chat(question, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{problems_from_value, recommendations_from_value};

    const WELL_FORMED: &str = "Bogotá, fecha 3 de marzo de 2026. Radicado número 2026-001.\n\n\
        Señor funcionario competente: en ejercicio del derecho de petición consagrado en el \
        artículo 23 de la Constitución y la Ley 1755 de 2015, solicito respuesta dentro de los \
        15 días hábiles siguientes.";

    fn categories(problems: &[WireProblem]) -> Vec<ProblemCategory> {
        problems.iter().map(|p| ProblemCategory::parse(&p.tipo)).collect()
    }

    #[test]
    fn detects_document_type() {
        assert_eq!(analyze("Derecho de petición").tipo_documento, "Derecho de Petición");
        assert_eq!(analyze("Recurso de apelación").tipo_documento, "Recurso Administrativo");
        assert_eq!(analyze("RESOLUCIÓN 12").tipo_documento, "Acto Administrativo");
        assert_eq!(analyze("Convenio marco").tipo_documento, "Contrato o Convenio");
        assert_eq!(analyze("hola").tipo_documento, "Documento Administrativo");
    }

    #[test]
    fn short_text_has_low_confidence() {
        let result = analyze("");
        assert_eq!(result.confianza, Some(0.3));
        assert_eq!(result.longitud, Some(0));
        assert_eq!(result.palabras_clave, vec!["Administrativo", "Legal", "Procedimiento", "Documento"]);
    }

    #[test]
    fn long_structured_text_has_high_confidence() {
        let paragraph = "Esta es una oración de prueba con contenido suficiente. ".repeat(6);
        let text = vec![paragraph; 7].join("\n\n");
        assert_eq!(analyze(&text).confianza, Some(0.9));
    }

    #[test]
    fn keywords_follow_rules() {
        let kw = analyze("Según la Constitución y el decreto, la autoridad competente...").palabras_clave;
        assert_eq!(kw, vec!["Constitución Política", "Decreto", "Competencia Administrativa"]);
    }

    #[test]
    fn bare_text_triggers_basic_problems() {
        let cats = categories(&detect_problems("Quiero saber algo."));
        assert_eq!(
            cats,
            vec![
                ProblemCategory::Structural,
                ProblemCategory::Legal,
                ProblemCategory::Administrative,
                ProblemCategory::Formal,
            ]
        );
    }

    #[test]
    fn well_formed_petition_yields_only_a_review_entry() {
        let problems = detect_problems(WELL_FORMED);
        assert_eq!(
            categories(&problems),
            vec![ProblemCategory::Other(CLEAN_REVIEW_CATEGORY.into())]
        );
        assert_eq!(problems[0].severidad, "BAJA");

        let decoded = problems_from_value(serde_json::to_value(&problems).unwrap()).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].severity, Level::Low);
    }

    #[test]
    fn missing_response_term_is_procedural() {
        let cats = categories(&detect_problems("En ejercicio del derecho de petición solicito..."));
        assert!(cats.contains(&ProblemCategory::Procedural));
    }

    #[test]
    fn unfounded_refusal_is_flagged() {
        let problems = detect_problems("La solicitud no procede. Fecha: hoy. Ley 1437, funcionario.");
        assert!(
            problems
                .iter()
                .any(|p| p.descripcion == "Respuesta negativa sin fundamentación legal clara")
        );
    }

    #[test]
    fn recommendations_map_categories_and_always_end_with_review() {
        let text = "no procede";
        let problems =
            problems_from_value(serde_json::to_value(detect_problems(text)).unwrap()).unwrap();
        let recs = generate_recommendations(text, &problems);
        let titles: Vec<&str> = recs.iter().map(|r| r.titulo.as_str()).collect();
        assert!(titles.contains(&"Agregar fundamentación legal completa"));
        assert!(titles.contains(&"Fundamentar respuesta negativa"));
        assert!(titles.contains(&"Expandir contenido del documento"));
        assert_eq!(titles.last(), Some(&"Revisión integral de calidad"));
    }

    #[tokio::test]
    async fn client_output_passes_validation() {
        let client = HeuristicClient::new();
        let raw = client.analyze(WELL_FORMED).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["tipo_documento"], "Derecho de Petición");

        let raw = client.generate_recommendations("", &[]).await.unwrap();
        let recs = recommendations_from_value(serde_json::from_str(&raw).unwrap()).unwrap();
        assert_eq!(recs.len(), 2);
    }
}
