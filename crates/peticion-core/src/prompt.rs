//! Prompt construction: persona preambles, domain specializations, and
//! sampling profiles for each wizard task.
//!
//! Prompt text is Spanish because the documents are Colombian administrative
//! petitions; everything around it is plain data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::session::ChatContext;
use crate::types::{AnalysisResult, Problem, Recommendation};

// ── Specializations ──

/// Canned expert framing injected between the persona block and the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Specialization {
    ConstitutionalRights,
    AdministrativeLaw,
    ProceduralLaw,
    FormalIssues,
    SubstantiveIssues,
    ConstitutionalIssues,
    ImmediateActions,
    StrategicImprovements,
    RiskMitigation,
    LegalFramework,
    ProceduralContext,
    InstitutionalContext,
    LegalAdvice,
    ProceduralGuidance,
    StrategicPlanning,
}

impl Specialization {
    pub const ALL: [Specialization; 15] = [
        Self::ConstitutionalRights,
        Self::AdministrativeLaw,
        Self::ProceduralLaw,
        Self::FormalIssues,
        Self::SubstantiveIssues,
        Self::ConstitutionalIssues,
        Self::ImmediateActions,
        Self::StrategicImprovements,
        Self::RiskMitigation,
        Self::LegalFramework,
        Self::ProceduralContext,
        Self::InstitutionalContext,
        Self::LegalAdvice,
        Self::ProceduralGuidance,
        Self::StrategicPlanning,
    ];

    /// Snake-case key, as used on the command line and in logs.
    pub fn key(&self) -> &'static str {
        match self {
            Self::ConstitutionalRights => "constitutional_rights",
            Self::AdministrativeLaw => "administrative_law",
            Self::ProceduralLaw => "procedural_law",
            Self::FormalIssues => "formal_issues",
            Self::SubstantiveIssues => "substantive_issues",
            Self::ConstitutionalIssues => "constitutional_issues",
            Self::ImmediateActions => "immediate_actions",
            Self::StrategicImprovements => "strategic_improvements",
            Self::RiskMitigation => "risk_mitigation",
            Self::LegalFramework => "legal_framework",
            Self::ProceduralContext => "procedural_context",
            Self::InstitutionalContext => "institutional_context",
            Self::LegalAdvice => "legal_advice",
            Self::ProceduralGuidance => "procedural_guidance",
            Self::StrategicPlanning => "strategic_planning",
        }
    }

    pub fn framing(&self) -> &'static str {
        match self {
            Self::ConstitutionalRights => {
                "Eres un experto en derecho constitucional colombiano. Analiza el documento considerando:\n\
                 - Derechos fundamentales involucrados\n\
                 - Principios constitucionales aplicables\n\
                 - Jurisprudencia de la Corte Constitucional\n\
                 - Mecanismos de protección constitucional"
            }
            Self::AdministrativeLaw => {
                "Eres un especialista en derecho administrativo colombiano. Evalúa:\n\
                 - Procedimientos administrativos aplicables\n\
                 - Actos administrativos involucrados\n\
                 - Recursos administrativos disponibles\n\
                 - Principios de la función administrativa"
            }
            Self::ProceduralLaw => {
                "Eres un experto en derecho procesal administrativo. Revisa:\n\
                 - Términos y plazos procesales\n\
                 - Formalidades del procedimiento\n\
                 - Medios de prueba aplicables\n\
                 - Recursos y medios de impugnación"
            }
            Self::FormalIssues => {
                "Identifica problemas formales específicos:\n\
                 - Falta de identificación del peticionario\n\
                 - Ausencia de fecha o lugar\n\
                 - Falta de firma o autenticación\n\
                 - Problemas de competencia territorial\n\
                 - Incumplimiento de términos procesales"
            }
            Self::SubstantiveIssues => {
                "Detecta problemas sustanciales:\n\
                 - Falta de fundamentación legal\n\
                 - Argumentación insuficiente\n\
                 - Ausencia de pruebas o documentos\n\
                 - Solicitudes imprecisas o ambiguas\n\
                 - Falta de legitimación o interés"
            }
            Self::ConstitutionalIssues => {
                "Identifica problemas constitucionales:\n\
                 - Violación de derechos fundamentales\n\
                 - Falta de debido proceso\n\
                 - Discriminación o arbitrariedad\n\
                 - Restricciones desproporcionadas\n\
                 - Falta de motivación suficiente"
            }
            Self::ImmediateActions => {
                "Recomendaciones de acción inmediata:\n\
                 - Correcciones que deben hacerse antes de presentar\n\
                 - Documentos adicionales necesarios\n\
                 - Plazos críticos a considerar\n\
                 - Recursos urgentes requeridos"
            }
            Self::StrategicImprovements => {
                "Mejoras estratégicas a mediano plazo:\n\
                 - Fortalecimiento de argumentación legal\n\
                 - Estrategias de defensa\n\
                 - Alianzas o apoyos necesarios\n\
                 - Recursos y capacidades a desarrollar"
            }
            Self::RiskMitigation => {
                "Mitigación de riesgos:\n\
                 - Identificación de puntos débiles\n\
                 - Estrategias de defensa preventiva\n\
                 - Recursos de contingencia\n\
                 - Planes alternativos"
            }
            Self::LegalFramework => {
                "Analiza el marco legal aplicable:\n\
                 - Normas constitucionales relevantes\n\
                 - Leyes y decretos aplicables\n\
                 - Jurisprudencia pertinente\n\
                 - Doctrina administrativa"
            }
            Self::ProceduralContext => {
                "Evalúa el contexto procedimental:\n\
                 - Etapa del procedimiento administrativo\n\
                 - Plazos y términos aplicables\n\
                 - Recursos disponibles\n\
                 - Posibles obstáculos"
            }
            Self::InstitutionalContext => {
                "Considera el contexto institucional:\n\
                 - Naturaleza de la entidad\n\
                 - Competencias específicas\n\
                 - Procedimientos internos\n\
                 - Relaciones con otras entidades"
            }
            Self::LegalAdvice => {
                "Proporciona asesoría legal especializada:\n\
                 - Explicación de conceptos jurídicos\n\
                 - Interpretación de normas aplicables\n\
                 - Análisis de jurisprudencia\n\
                 - Recomendaciones estratégicas"
            }
            Self::ProceduralGuidance => {
                "Orienta en procedimientos administrativos:\n\
                 - Pasos a seguir\n\
                 - Documentos necesarios\n\
                 - Plazos importantes\n\
                 - Recursos disponibles"
            }
            Self::StrategicPlanning => {
                "Ayuda en planificación estratégica:\n\
                 - Análisis de fortalezas y debilidades\n\
                 - Identificación de oportunidades\n\
                 - Evaluación de riesgos\n\
                 - Desarrollo de estrategias"
            }
        }
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Specialization {
    type Err = String;

    /// Accepts `snake_case` or `kebab-case` keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.key() == key)
            .ok_or_else(|| format!("unknown specialization: {s}"))
    }
}

// ── Quality profiles ──

/// Sampling parameters for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

const BASIC_ANALYSIS: QualityProfile = QualityProfile {
    temperature: 0.1,
    max_tokens: 2000,
    top_p: 0.8,
    top_k: 40,
};

const DETAILED_ANALYSIS: QualityProfile = QualityProfile {
    temperature: 0.2,
    max_tokens: 4000,
    top_p: 0.9,
    top_k: 50,
};

const CREATIVE_SOLUTIONS: QualityProfile = QualityProfile {
    temperature: 0.3,
    max_tokens: 3000,
    top_p: 0.95,
    top_k: 60,
};

const LEGAL_EXPERTISE: QualityProfile = QualityProfile {
    temperature: 0.1,
    max_tokens: 5000,
    top_p: 0.85,
    top_k: 45,
};

/// Key of the profile returned for unknown lookups.
pub const DEFAULT_PROFILE: &str = "detailed_analysis";

/// Look up a sampling profile by name. Unknown names get the default profile.
pub fn get_quality_profile(key: &str) -> QualityProfile {
    match key {
        "basic_analysis" => BASIC_ANALYSIS,
        "detailed_analysis" => DETAILED_ANALYSIS,
        "creative_solutions" => CREATIVE_SOLUTIONS,
        "legal_expertise" => LEGAL_EXPERTISE,
        _ => DETAILED_ANALYSIS,
    }
}

// ── Tasks ──

/// The four orchestrated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Analyze,
    DetectProblems,
    Recommend,
    Chat,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::DetectProblems => "detect_problems",
            Self::Recommend => "generate_recommendations",
            Self::Chat => "chat",
        }
    }

    /// Name of the quality profile used for this task.
    pub fn profile_key(&self) -> &'static str {
        match self {
            Self::Analyze | Self::DetectProblems => "legal_expertise",
            Self::Recommend => "creative_solutions",
            Self::Chat => "detailed_analysis",
        }
    }

    pub fn profile(&self) -> QualityProfile {
        get_quality_profile(self.profile_key())
    }

    /// Maximum document excerpt length in characters, if the task sends one.
    pub fn excerpt_limit(&self) -> Option<usize> {
        match self {
            Self::Analyze => Some(4000),
            Self::DetectProblems => Some(3000),
            Self::Recommend => Some(2000),
            Self::Chat => None,
        }
    }

    pub fn specialization(&self) -> Specialization {
        match self {
            Self::Analyze => Specialization::AdministrativeLaw,
            Self::DetectProblems => Specialization::ProceduralLaw,
            Self::Recommend => Specialization::StrategicImprovements,
            Self::Chat => Specialization::LegalAdvice,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Builders ──

/// Join a role block, an optional specialization, and free context.
pub fn build_prompt(
    role_instructions: &str,
    specialization: Option<Specialization>,
    context: &str,
) -> String {
    let framing = specialization.map(|s| s.framing()).unwrap_or("");
    format!("{role_instructions}\n\n{framing}\n\n{context}")
        .trim()
        .to_string()
}

/// Append an "additional context" bullet list to `base`.
pub fn enhance_with_context(base: &str, elements: &[(&str, String)]) -> String {
    let mut out = format!("{base}\n\nCONTEXTO ADICIONAL:");
    for (key, value) in elements {
        out.push_str(&format!("\n- {key}: {value}"));
    }
    out
}

/// Character-safe prefix of at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// A fully built request for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub task: Task,
    pub system: String,
    pub user: String,
    /// Query used by retrieval-augmented transports to fetch supporting passages.
    pub retrieval_query: String,
    pub profile: QualityProfile,
}

impl Prompt {
    /// Render as a single text prompt for transports without a system role.
    pub fn render(&self) -> String {
        format!(
            "INSTRUCCIONES DEL SISTEMA:\n{system}\n\n\
             SOLICITUD DEL USUARIO:\n{user}\n\n\
             IMPORTANTE: Responde de manera completa, profesional y fundamentada. \
             Si se solicita JSON, asegúrate de que sea válido y completo.",
            system = self.system,
            user = self.user,
        )
    }
}

const ANALYSIS_ROLE: &str = "\
Eres un abogado experto en derecho administrativo colombiano con más de 15 años de experiencia. \
Tu especialidad es el análisis de derechos de petición y procedimientos administrativos.

INSTRUCCIONES ESPECÍFICAS:
1. Analiza el documento desde una perspectiva legal integral
2. Identifica elementos formales y sustanciales
3. Evalúa la calidad jurídica del documento
4. Usa terminología legal precisa pero comprensible
5. Incluye referencias a normativa aplicable cuando sea relevante

FORMATO DE RESPUESTA: Devuelve SOLO un JSON válido con la siguiente estructura:
{
  \"tipo_documento\": \"Tipo específico del documento\",
  \"longitud\": <número de caracteres>,
  \"palabras_clave\": [\"término1\", \"término2\", \"término3\", \"término4\", \"término5\"],
  \"confianza\": <número entre 0.0 y 1.0>,
  \"analisis_markdown\": \"Análisis en Markdown: resumen ejecutivo, estructura formal, \
contenido sustancial, fortalezas y debilidades, observaciones legales y recomendaciones preliminares\"
}";

const PROBLEMS_ROLE: &str = "\
Eres un abogado revisor especializado en derecho administrativo colombiano con amplia experiencia \
en control de legalidad.

INSTRUCCIONES ESPECÍFICAS:
1. Identifica problemas formales (procedimiento, términos, competencia)
2. Detecta problemas sustanciales (fundamento legal, argumentación, pruebas)
3. Evalúa la severidad considerando el impacto en el procedimiento
4. Incluye referencias a normativa aplicable cuando sea relevante

CATEGORÍAS DE PROBLEMAS:
- FORMAL: Procedimiento, términos, competencia, notificaciones
- SUSTANCIAL: Fundamento legal, argumentación, pruebas, mérito
- CONSTITUCIONAL: Derechos fundamentales, debido proceso
- ADMINISTRATIVO: Actos administrativos, recursos, procedimientos
- PROCEDIMENTAL: Términos, etapas y vías de recurso

FORMATO DE RESPUESTA: Devuelve SOLO un array JSON de objetos con:
{
  \"tipo\": \"FORMAL/SUSTANCIAL/CONSTITUCIONAL/ADMINISTRATIVO/PROCEDIMENTAL\",
  \"descripcion\": \"Descripción detallada del problema\",
  \"severidad\": \"ALTA/MEDIA/BAJA\",
  \"linea\": \"Número de línea aproximado o 'N/A'\",
  \"fundamento_legal\": \"Norma o jurisprudencia aplicable\",
  \"impacto\": \"Impacto en el procedimiento\",
  \"recomendacion_breve\": \"Sugerencia de corrección específica\"
}";

const RECOMMENDATIONS_ROLE: &str = "\
Eres un abogado redactor especializado en derecho administrativo colombiano con experiencia \
en litigio y asesoría.

INSTRUCCIONES ESPECÍFICAS:
1. Genera recomendaciones específicas para cada problema identificado
2. Prioriza según el impacto en el procedimiento
3. Proporciona acciones concretas y ejecutables
4. Incluye fundamento legal y jurisprudencia relevante

CRITERIOS DE PRIORIZACIÓN:
- ALTA: Problemas que pueden causar nulidad o inadmisibilidad
- MEDIA: Problemas que afectan la eficacia del procedimiento
- BAJA: Problemas menores o de forma

FORMATO DE RESPUESTA: Devuelve SOLO un array JSON de objetos con:
{
  \"titulo\": \"Título de la recomendación\",
  \"descripcion\": \"Descripción detallada con fundamento\",
  \"prioridad\": \"ALTA/MEDIA/BAJA\",
  \"accion\": \"Acción específica y ejecutable\",
  \"fundamento_legal\": \"Norma que respalda la recomendación\",
  \"tiempo_estimado\": \"inmediato/corto plazo/mediano plazo\",
  \"recursos_necesarios\": \"Recursos requeridos\",
  \"impacto_esperado\": \"Resultado esperado\",
  \"riesgos\": \"Riesgos o consideraciones\"
}";

const CHAT_ROLE: &str = "\
Eres un asistente legal especializado en derecho administrativo colombiano, con experiencia en \
derecho constitucional y procedimental.

INSTRUCCIONES ESPECÍFICAS:
1. Responde de manera profesional, clara y útil
2. Utiliza el contexto del análisis previo cuando esté disponible
3. Incluye fundamento legal cuando sea relevante
4. Ofrece orientación práctica y accionable";

const JSON_ONLY: &str = "IMPORTANTE: Responde ÚNICAMENTE con el JSON solicitado, sin texto adicional.";

fn excerpt(task: Task, text: &str) -> &str {
    match task.excerpt_limit() {
        Some(limit) => truncate_chars(text, limit),
        None => text,
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

// Prior stages are fed back in the Spanish-keyed shape the model was asked
// to produce.

#[derive(Serialize)]
struct AnalysisView<'a> {
    tipo_documento: &'a str,
    longitud: usize,
    palabras_clave: &'a [String],
    confianza: f64,
    fecha_analisis: String,
    analisis_markdown: &'a str,
}

impl<'a> From<&'a AnalysisResult> for AnalysisView<'a> {
    fn from(a: &'a AnalysisResult) -> Self {
        Self {
            tipo_documento: &a.document_type,
            longitud: a.length,
            palabras_clave: &a.keywords,
            confianza: a.confidence,
            fecha_analisis: a.analysis_date.format("%d/%m/%Y").to_string(),
            analisis_markdown: &a.narrative,
        }
    }
}

#[derive(Serialize)]
struct ProblemView<'a> {
    tipo: &'a str,
    descripcion: &'a str,
    severidad: &'static str,
    linea: &'a str,
    fundamento_legal: &'a str,
    impacto: &'a str,
    recomendacion_breve: &'a str,
}

impl<'a> From<&'a Problem> for ProblemView<'a> {
    fn from(p: &'a Problem) -> Self {
        Self {
            tipo: p.category.spanish_label(),
            descripcion: &p.description,
            severidad: p.severity.spanish_label(),
            linea: &p.line,
            fundamento_legal: &p.legal_basis,
            impacto: &p.impact,
            recomendacion_breve: &p.short_recommendation,
        }
    }
}

#[derive(Serialize)]
struct RecommendationView<'a> {
    titulo: &'a str,
    descripcion: &'a str,
    prioridad: &'static str,
    accion: &'a str,
    fundamento_legal: &'a str,
    tiempo_estimado: &'a str,
    recursos_necesarios: &'a str,
    impacto_esperado: &'a str,
    riesgos: &'a str,
}

impl<'a> From<&'a Recommendation> for RecommendationView<'a> {
    fn from(r: &'a Recommendation) -> Self {
        Self {
            titulo: &r.title,
            descripcion: &r.description,
            prioridad: r.priority.spanish_label(),
            accion: &r.action,
            fundamento_legal: &r.legal_basis,
            tiempo_estimado: &r.estimated_time,
            recursos_necesarios: &r.resources_needed,
            impacto_esperado: &r.expected_impact,
            riesgos: &r.risks,
        }
    }
}

fn analysis_json(analysis: &AnalysisResult) -> String {
    to_json(&AnalysisView::from(analysis))
}

fn problems_json(problems: &[Problem]) -> String {
    to_json(&problems.iter().map(ProblemView::from).collect::<Vec<_>>())
}

fn recommendations_json(recommendations: &[Recommendation]) -> String {
    to_json(&recommendations.iter().map(RecommendationView::from).collect::<Vec<_>>())
}

/// Prompt for the initial document analysis.
pub fn analysis_prompt(document: &str) -> Prompt {
    let task = Task::Analyze;
    let user = format!(
        "DOCUMENTO A ANALIZAR:\n\"\"\"{doc}\"\"\"\n\n\
         REQUISITOS DEL ANÁLISIS:\n\
         - Identifica elementos clave del derecho de petición\n\
         - Evalúa la calidad jurídica del documento\n\
         - Proporciona observaciones específicas y accionables\n\n\
         {JSON_ONLY}",
        doc = excerpt(task, document),
    );
    Prompt {
        task,
        system: build_prompt(ANALYSIS_ROLE, Some(task.specialization()), ""),
        user,
        retrieval_query: "Analiza este documento legal y proporciona un análisis detallado".into(),
        profile: task.profile(),
    }
}

/// Prompt for problem detection, carrying the analysis as prior context.
pub fn problems_prompt(document: &str, analysis: &AnalysisResult) -> Prompt {
    let task = Task::DetectProblems;
    let user = format!(
        "DOCUMENTO A REVISAR:\n\"\"\"{doc}\"\"\"\n\n\
         CONTEXTO DEL ANÁLISIS PREVIO:\n{context}\n\n\
         REQUISITOS DE LA REVISIÓN:\n\
         - Identifica todos los problemas relevantes (mínimo 3)\n\
         - Clasifica por categoría y severidad\n\
         - Incluye fundamento legal específico\n\n\
         IMPORTANTE: Responde ÚNICAMENTE con el array JSON solicitado, sin texto adicional.",
        doc = excerpt(task, document),
        context = analysis_json(analysis),
    );
    Prompt {
        task,
        system: build_prompt(PROBLEMS_ROLE, Some(task.specialization()), ""),
        user,
        retrieval_query: "Identifica problemas legales y formales en este documento".into(),
        profile: task.profile(),
    }
}

/// Prompt for recommendations, carrying the detected problems.
pub fn recommendations_prompt(document: &str, problems: &[Problem]) -> Prompt {
    let task = Task::Recommend;
    let user = format!(
        "PROBLEMAS IDENTIFICADOS:\n{problems}\n\n\
         CONTEXTO DEL DOCUMENTO:\n\"\"\"{doc}\"\"\"\n\n\
         REQUISITOS DE LAS RECOMENDACIONES:\n\
         - Genera recomendaciones para cada problema identificado\n\
         - Prioriza según el impacto en el procedimiento administrativo\n\
         - Evalúa riesgos y recursos necesarios\n\n\
         IMPORTANTE: Responde ÚNICAMENTE con el array JSON solicitado, sin texto adicional.",
        problems = problems_json(problems),
        doc = excerpt(task, document),
    );
    Prompt {
        task,
        system: build_prompt(RECOMMENDATIONS_ROLE, Some(task.specialization()), ""),
        user,
        retrieval_query: "Genera recomendaciones para mejorar este documento legal".into(),
        profile: task.profile(),
    }
}

/// Prompt for a chat turn. Missing stages render as "not available".
pub fn chat_prompt(question: &str, context: &ChatContext<'_>) -> Prompt {
    let task = Task::Chat;
    let analysis = context
        .analysis
        .map(analysis_json)
        .unwrap_or_else(|| "No disponible".into());
    let problems = context
        .problems
        .map(problems_json)
        .unwrap_or_else(|| "No disponibles".into());
    let recommendations = context
        .recommendations
        .map(recommendations_json)
        .unwrap_or_else(|| "No disponibles".into());

    let base = format!("PREGUNTA DEL USUARIO: {}", question.trim());
    let with_context = enhance_with_context(
        &base,
        &[
            ("Análisis del documento", analysis),
            ("Problemas detectados", problems),
            ("Recomendaciones generadas", recommendations),
        ],
    );
    let user = format!(
        "{with_context}\n\n\
         Responde la pregunta de manera completa y útil, usando el contexto cuando sea relevante. \
         Si la pregunta no está relacionada con el análisis previo, responde con tu conocimiento \
         legal general."
    );
    Prompt {
        task,
        system: build_prompt(CHAT_ROLE, Some(task.specialization()), ""),
        user,
        retrieval_query: question.trim().to_string(),
        profile: task.profile(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Level, ProblemCategory};
    use chrono::NaiveDate;

    fn sample_analysis() -> AnalysisResult {
        AnalysisResult {
            document_type: "Derecho de Petición".into(),
            length: 42,
            confidence: 0.8,
            keywords: vec!["petición".into()],
            analysis_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            narrative: "## Resumen".into(),
        }
    }

    #[test]
    fn unknown_profile_resolves_to_default() {
        assert_eq!(get_quality_profile("nonexistent_key"), DETAILED_ANALYSIS);
        assert_eq!(get_quality_profile(""), get_quality_profile(DEFAULT_PROFILE));
    }

    #[test]
    fn known_profiles_are_distinct() {
        let legal = get_quality_profile("legal_expertise");
        assert_eq!(legal.max_tokens, 5000);
        assert_eq!(legal.top_k, 45);
        assert_eq!(get_quality_profile("basic_analysis").max_tokens, 2000);
        assert_eq!(get_quality_profile("creative_solutions").top_p, 0.95);
    }

    #[test]
    fn specialization_keys_round_trip() {
        for specialization in Specialization::ALL {
            assert_eq!(specialization.key().parse::<Specialization>(), Ok(specialization));
            assert!(!specialization.framing().is_empty());
        }
        assert_eq!(
            "administrative-law".parse::<Specialization>(),
            Ok(Specialization::AdministrativeLaw)
        );
        assert!("family_law".parse::<Specialization>().is_err());
    }

    #[test]
    fn build_prompt_joins_and_trims() {
        let prompt = build_prompt("  ROL  ", Some(Specialization::ProceduralLaw), "CONTEXTO\n");
        assert!(prompt.starts_with("ROL"));
        assert!(prompt.contains("derecho procesal administrativo"));
        assert!(prompt.ends_with("CONTEXTO"));
    }

    #[test]
    fn build_prompt_without_specialization() {
        assert_eq!(build_prompt("ROL", None, ""), "ROL");
    }

    #[test]
    fn enhance_with_context_lists_elements() {
        let out = enhance_with_context("BASE", &[("a", "1".into()), ("b", "2".into())]);
        assert_eq!(out, "BASE\n\nCONTEXTO ADICIONAL:\n- a: 1\n- b: 2");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("peticiónes", 8), "petición");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn analysis_prompt_truncates_document() {
        let doc = "á".repeat(5000);
        let prompt = analysis_prompt(&doc);
        assert!(prompt.user.contains(&"á".repeat(4000)));
        assert!(!prompt.user.contains(&"á".repeat(4001)));
        assert_eq!(prompt.profile, get_quality_profile("legal_expertise"));
        assert!(prompt.system.contains("especialista en derecho administrativo"));
    }

    #[test]
    fn later_stages_use_shorter_excerpts() {
        let doc = "x".repeat(5000);
        let problems = problems_prompt(&doc, &sample_analysis());
        assert!(problems.user.contains(&"x".repeat(3000)));
        assert!(!problems.user.contains(&"x".repeat(3001)));
        assert!(problems.user.contains("\"tipo_documento\":\"Derecho de Petición\""));
        assert!(problems.user.contains("\"fecha_analisis\":\"01/03/2026\""));

        let recs = recommendations_prompt(&doc, &[]);
        assert!(!recs.user.contains(&"x".repeat(2001)));
        assert!(recs.system.contains("Mejoras estratégicas"));
    }

    #[test]
    fn recommendations_prompt_serializes_problems() {
        let problem = Problem {
            category: ProblemCategory::Formal,
            description: "Falta radicado".into(),
            severity: Level::High,
            line: "N/A".into(),
            legal_basis: String::new(),
            impact: String::new(),
            short_recommendation: String::new(),
        };
        let prompt = recommendations_prompt("doc", &[problem]);
        assert!(prompt.user.contains("\"tipo\":\"FORMAL\""));
        assert!(prompt.user.contains("\"severidad\":\"ALTA\""));
        assert!(prompt.user.contains("\"descripcion\":\"Falta radicado\""));
        assert!(!prompt.user.contains("\"category\""));
    }

    #[test]
    fn chat_prompt_marks_missing_stages() {
        let analysis = sample_analysis();
        let ctx = ChatContext {
            analysis: Some(&analysis),
            problems: None,
            recommendations: None,
        };
        let prompt = chat_prompt("¿Cómo mejorar?", &ctx);
        assert!(prompt.user.contains("PREGUNTA DEL USUARIO: ¿Cómo mejorar?"));
        assert!(prompt.user.contains("- Problemas detectados: No disponibles"));
        assert!(prompt.user.contains("- Recomendaciones generadas: No disponibles"));
        assert_eq!(prompt.retrieval_query, "¿Cómo mejorar?");
    }

    #[test]
    fn render_wraps_system_and_user() {
        let rendered = analysis_prompt("doc").render();
        assert!(rendered.starts_with("INSTRUCCIONES DEL SISTEMA:"));
        assert!(rendered.contains("SOLICITUD DEL USUARIO:"));
    }
}
