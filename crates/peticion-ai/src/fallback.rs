//! Static results used when no model output is usable.
//!
//! Every task has a schema-conforming default so the wizard can always move
//! forward. The recommendation default is extended per problem through an
//! [`AugmentationPolicy`].

use chrono::NaiveDate;
use peticion_core::prompt::truncate_chars;
use peticion_core::types::fold_label;
use peticion_core::{AnalysisResult, ChatContext, Level, Problem, ProblemCategory, Recommendation};

const FALLBACK_CONFIDENCE: f64 = 0.75;

const FALLBACK_NARRATIVE: &str = "\
## Análisis del Documento

### Resumen Ejecutivo
El documento corresponde a un derecho de petición presentado ante una entidad administrativa. \
Se requiere análisis adicional para determinar su calidad jurídica completa.

### Estructura Formal
- **Tipo de documento**: Derecho de Petición
- **Formato**: Requiere verificación de estructura

### Evaluación Preliminar
- **Áreas de mejora**: Requiere análisis detallado de contenido
- **Observaciones**: Análisis básico realizado, se recomienda revisión completa

### Recomendaciones Preliminares
1. Revisar estructura formal del documento
2. Verificar fundamentación legal
3. Evaluar competencia de la entidad
4. Analizar argumentación sustancial

*Nota: Este es un análisis básico. Se requiere procesamiento completo para evaluación detallada.*";

/// Default analysis. `length` is the real character count of `document`.
pub fn analysis(document: &str, today: NaiveDate) -> AnalysisResult {
    AnalysisResult {
        document_type: "Derecho de Petición".into(),
        length: document.chars().count(),
        confidence: FALLBACK_CONFIDENCE,
        keywords: ["petición", "derecho", "solicitud", "administrativo", "procedimiento"]
            .map(String::from)
            .to_vec(),
        analysis_date: today,
        narrative: FALLBACK_NARRATIVE.into(),
    }
}

fn problem(
    category: ProblemCategory,
    description: &str,
    severity: Level,
    legal_basis: &str,
    impact: &str,
    short_recommendation: &str,
) -> Problem {
    Problem {
        category,
        description: description.into(),
        severity,
        line: "N/A".into(),
        legal_basis: legal_basis.into(),
        impact: impact.into(),
        short_recommendation: short_recommendation.into(),
    }
}

/// Default problem list: the defects most petitions have.
pub fn problems() -> Vec<Problem> {
    vec![
        problem(
            ProblemCategory::Formal,
            "Falta número de radicado o identificación del expediente administrativo",
            Level::High,
            "Art. 5 Ley 1437 de 2011 - Código de Procedimiento Administrativo",
            "Puede causar confusión en el seguimiento del trámite",
            "Incluir número de radicado o crear expediente administrativo",
        ),
        problem(
            ProblemCategory::Administrative,
            "No se identifica claramente la autoridad competente para resolver la petición",
            Level::Medium,
            "Art. 2 Ley 1437 de 2011 - Principio de competencia",
            "Puede retrasar la respuesta o causar remisión a otra entidad",
            "Especificar la entidad y dependencia competente",
        ),
        problem(
            ProblemCategory::Substantive,
            "Falta fundamentación legal específica de la petición",
            Level::Medium,
            "Art. 6 Ley 1437 de 2011 - Principio de motivación",
            "Puede afectar la calidad de la respuesta administrativa",
            "Incluir fundamento legal y argumentación jurídica",
        ),
    ]
}

/// Builder for the long recommendation literals below.
struct Rec<'a> {
    title: &'a str,
    description: &'a str,
    priority: Level,
    action: &'a str,
    legal_basis: &'a str,
    estimated_time: &'a str,
    resources_needed: &'a str,
    expected_impact: &'a str,
    risks: &'a str,
}

impl Rec<'_> {
    fn build(&self) -> Recommendation {
        Recommendation {
            title: self.title.into(),
            description: self.description.into(),
            priority: self.priority,
            action: self.action.into(),
            legal_basis: self.legal_basis.into(),
            estimated_time: self.estimated_time.into(),
            resources_needed: self.resources_needed.into(),
            expected_impact: self.expected_impact.into(),
            risks: self.risks.into(),
        }
    }
}

const BASE_RECOMMENDATIONS: [Rec<'static>; 5] = [
    Rec {
        title: "Aclarar competencia administrativa",
        description: "Especificar claramente la entidad y dependencia competente para resolver la petición",
        priority: Level::High,
        action: "Citar la norma que establece la competencia y especificar la dependencia exacta",
        legal_basis: "Art. 2 Ley 1437 de 2011 - Principio de competencia",
        estimated_time: "inmediato",
        resources_needed: "Revisión de organigrama y normativa de la entidad",
        expected_impact: "Asegurar que la petición llegue a la autoridad correcta",
        risks: "Bajo - solo requiere verificación de información",
    },
    Rec {
        title: "Estructurar contestación administrativa",
        description: "Organizar la respuesta en secciones claras y lógicas para facilitar su comprensión",
        priority: Level::Medium,
        action: "Usar formato estructurado con encabezados, numeración y párrafos organizados",
        legal_basis: "Art. 6 Ley 1437 de 2011 - Principio de claridad",
        estimated_time: "corto plazo",
        resources_needed: "Plantilla de respuesta estructurada",
        expected_impact: "Mejor comprensión y seguimiento de la respuesta",
        risks: "Bajo - mejora la presentación sin afectar el fondo",
    },
    Rec {
        title: "Fundamentar respuesta legalmente",
        description: "Incluir fundamento legal específico y jurisprudencia aplicable en la contestación",
        priority: Level::High,
        action: "Citar normas específicas, jurisprudencia y precedentes administrativos",
        legal_basis: "Art. 6 Ley 1437 de 2011 - Principio de motivación",
        estimated_time: "corto plazo",
        resources_needed: "Investigación legal y consulta de jurisprudencia",
        expected_impact: "Respuesta jurídicamente sólida y defendible",
        risks: "Medio - requiere tiempo de investigación legal",
    },
    Rec {
        title: "Verificar términos procesales",
        description: "Confirmar que se respeten los términos legales para la presentación y respuesta",
        priority: Level::High,
        action: "Revisar calendario de términos y verificar cumplimiento de plazos",
        legal_basis: "Art. 23 Constitución Política - Derecho de petición",
        estimated_time: "inmediato",
        resources_needed: "Revisión de calendario y normativa de términos",
        expected_impact: "Evitar nulidades por vencimiento de términos",
        risks: "Alto - términos vencidos pueden causar nulidad",
    },
    Rec {
        title: "Mejorar argumentación sustancial",
        description: "Fortalecer los argumentos de fondo con evidencia y precedentes relevantes",
        priority: Level::Medium,
        action: "Incluir evidencia documental, precedentes y argumentación jurídica sólida",
        legal_basis: "Art. 6 Ley 1437 de 2011 - Principio de motivación",
        estimated_time: "mediano plazo",
        resources_needed: "Investigación de precedentes y evidencia adicional",
        expected_impact: "Argumentación más convincente y defendible",
        risks: "Medio - requiere tiempo de investigación",
    },
];

/// Base recommendation list, before augmentation.
pub fn base_recommendations() -> Vec<Recommendation> {
    BASE_RECOMMENDATIONS.iter().map(Rec::build).collect()
}

/// Template for a recommendation derived from one problem.
///
/// `{desc}` in `title` is replaced by the first 50 characters of the problem
/// description; in `description` by the full description.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationRule {
    pub category: ProblemCategory,
    pub title: String,
    pub description: String,
    pub priority: Level,
    pub action: String,
    pub legal_basis: String,
    pub estimated_time: String,
    pub resources_needed: String,
    pub expected_impact: String,
    pub risks: String,
}

/// Characters of the problem description quoted in a derived title.
const TITLE_EXCERPT_CHARS: usize = 50;

impl AugmentationRule {
    fn apply(&self, problem: &Problem) -> Recommendation {
        let excerpt = truncate_chars(&problem.description, TITLE_EXCERPT_CHARS);
        Recommendation {
            title: self.title.replace("{desc}", excerpt),
            description: self.description.replace("{desc}", &problem.description),
            priority: self.priority,
            action: self.action.clone(),
            legal_basis: self.legal_basis.clone(),
            estimated_time: self.estimated_time.clone(),
            resources_needed: self.resources_needed.clone(),
            expected_impact: self.expected_impact.clone(),
            risks: self.risks.clone(),
        }
    }
}

/// Rules that extend the fallback recommendations from detected problems.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationPolicy {
    pub rules: Vec<AugmentationRule>,
    /// Only the first `max_problems` problems are considered.
    pub max_problems: usize,
}

impl AugmentationPolicy {
    /// A policy that never adds anything.
    pub fn none() -> Self {
        Self {
            rules: Vec::new(),
            max_problems: 0,
        }
    }

    /// Recommendations derived from `problems`, in problem order.
    pub fn derive(&self, problems: &[Problem]) -> Vec<Recommendation> {
        problems
            .iter()
            .take(self.max_problems)
            .flat_map(|p| {
                self.rules
                    .iter()
                    .filter(move |r| r.category == p.category)
                    .map(move |r| r.apply(p))
            })
            .collect()
    }
}

impl Default for AugmentationPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                AugmentationRule {
                    category: ProblemCategory::Formal,
                    title: "Corregir problema formal: {desc}...".into(),
                    description: "Resolver el problema formal identificado: {desc}".into(),
                    priority: Level::Medium,
                    action: "Revisar y corregir la formalidad del documento".into(),
                    legal_basis: "Art. 5 Ley 1437 de 2011 - Principio de formalidad".into(),
                    estimated_time: "corto plazo".into(),
                    resources_needed: "Revisión de formato y estructura".into(),
                    expected_impact: "Documento formalmente correcto".into(),
                    risks: "Bajo - corrección de forma".into(),
                },
                AugmentationRule {
                    category: ProblemCategory::Substantive,
                    title: "Fortalecer argumentación sustancial: {desc}...".into(),
                    description: "Mejorar la argumentación sustancial: {desc}".into(),
                    priority: Level::High,
                    action: "Desarrollar argumentos más sólidos y fundamentados".into(),
                    legal_basis: "Art. 6 Ley 1437 de 2011 - Principio de motivación".into(),
                    estimated_time: "mediano plazo".into(),
                    resources_needed: "Investigación legal y desarrollo de argumentos".into(),
                    expected_impact: "Argumentación más convincente".into(),
                    risks: "Medio - requiere análisis profundo".into(),
                },
            ],
            max_problems: 3,
        }
    }
}

/// Base recommendations followed by those derived from `problems`.
pub fn recommendations(problems: &[Problem], policy: &AugmentationPolicy) -> Vec<Recommendation> {
    let mut out = base_recommendations();
    out.extend(policy.derive(problems));
    out
}

// ── Chat ──

const ANSWER_STRUCTURE: &str = "\
Para mejorar la contestación de tu documento, sigue estas recomendaciones:

**Estructura recomendada**
1. **Encabezado formal** con datos de la entidad y fecha
2. **Referencia** al derecho de petición (número de radicado)
3. **Fundamento legal** con citas específicas
4. **Análisis del caso** con argumentos claros
5. **Conclusión** con respuesta específica
6. **Firma** del funcionario competente

**Elementos clave**
- **Claridad**: usa lenguaje simple y directo
- **Precisión**: responde exactamente lo que se pregunta
- **Fundamentación**: cita normas y jurisprudencia aplicable
- **Oportunidad**: respeta los términos legales (15 días hábiles)
- **Completitud**: no dejes preguntas sin responder

**Evita** respuestas vagas, la falta de fundamentación legal y las respuestas fuera de término.";

const ANSWER_NORMS: &str = "\
Para fundamentar tu documento, cita la siguiente normativa colombiana:

**Normativa principal**
- **Constitución Política de Colombia (1991)**: artículos 23, 29, 84 y 86
- **Ley 1437 de 2011** (Código de Procedimiento Administrativo y de lo Contencioso Administrativo)
- **Ley 1755 de 2015**, que regula el derecho fundamental de petición

**Recomendaciones**
1. **Cita específica**: no solo menciones la ley, cita el artículo exacto
2. **Contexto legal**: explica cómo se aplica la norma a tu caso
3. **Jurisprudencia**: incluye sentencias de la Corte Constitucional cuando sea relevante
4. **Vigencia**: verifica que las normas citadas estén vigentes

**Ejemplo de citación**
\"Con fundamento en el artículo 23 de la Constitución Política, que consagra el derecho de \
petición, y el artículo 6 de la Ley 1437 de 2011, se solicita...\"";

const ANSWER_CRITICAL: &str = "\
Los problemas más críticos en un documento de este tipo suelen ser:

**Alta prioridad**
1. **Falta de fundamentación legal**: puede llevar a la nulidad. Cita artículos específicos.
2. **Falta de competencia administrativa**: el documento puede ser rechazado. Verifica la entidad.
3. **Falta de número de radicado**: dificulta el seguimiento. Asigna un número único.

**Media prioridad**
4. **Estructura desorganizada**: usa encabezados y numeración.
5. **Lenguaje complejo**: simplifica los términos técnicos.

**Criterios**: ALTA afecta la validez legal, MEDIA la comprensión, BAJA la presentación.";

const ANSWER_IMPLEMENTATION: &str = "\
Para implementar las recomendaciones de manera efectiva:

**Fase 1: fundamentación legal (días 1-2)**
- Consultar la Constitución Política y la Ley 1437 de 2011
- Identificar jurisprudencia aplicable y verificar su vigencia

**Fase 2: estructura y organización (días 3-4)**
- Crear encabezados claros y numeración lógica
- Separar secciones por tema y revisar ortografía

**Fase 3: validación y revisión (día 5)**
- Verificar fundamentación, competencia y número de radicado
- Confirmar el cumplimiento de términos

**Recursos**: abogado especializado, base de datos legal y normativa vigente.";

/// Keyword groups, checked in order; the first group with a whole-word hit wins.
const CHAT_TOPICS: [(&[&str], &str); 4] = [
    (
        &["MEJORAR", "MEJORA", "CONTESTACION", "RESPUESTA", "ESTRUCTURA"],
        ANSWER_STRUCTURE,
    ),
    (
        &["NORMATIVA", "NORMAS", "CITAR", "LEY", "LEYES", "DECRETO", "RESOLUCION"],
        ANSWER_NORMS,
    ),
    (
        &["PROBLEMA", "PROBLEMAS", "CRITICOS", "URGENTES", "PRIORITARIOS"],
        ANSWER_CRITICAL,
    ),
    (
        &["IMPLEMENTAR", "RECOMENDACIONES", "APLICAR", "EJECUTAR"],
        ANSWER_IMPLEMENTATION,
    ),
];

fn availability(count: Option<usize>, missing: &str) -> String {
    match count {
        Some(n) => format!("Disponible ({n} elementos)"),
        None => missing.to_string(),
    }
}

/// Canned chat answer chosen by question keywords. Never empty.
pub fn chat(question: &str, context: &ChatContext<'_>) -> String {
    let folded = fold_label(question);
    let words: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if let Some((_, answer)) = CHAT_TOPICS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| words.contains(k)))
    {
        return (*answer).to_string();
    }

    let analysis = match context.analysis {
        Some(a) => format!("Disponible ({})", a.document_type),
        None => "No disponible".into(),
    };
    let problems = availability(context.problems.map(<[Problem]>::len), "No disponibles");
    let recommendations = availability(
        context.recommendations.map(<[Recommendation]>::len),
        "No disponibles",
    );
    format!(
        "Para responder a tu pregunta sobre derecho administrativo colombiano, te recomiendo:\n\n\
         **Pasos recomendados**\n\
         1. **Identifica el tipo de documento** (derecho de petición, recurso, etc.)\n\
         2. **Revisa la fundamentación legal** actual\n\
         3. **Verifica la competencia administrativa**\n\
         4. **Estructura la respuesta** de manera clara y organizada\n\n\
         **Recursos disponibles**\n\
         - Análisis del documento: {analysis}\n\
         - Problemas identificados: {problems}\n\
         - Recomendaciones: {recommendations}\n\n\
         Si necesitas ayuda específica, reformula tu pregunta mencionando el aspecto que quieres \
         mejorar (por ejemplo \"fundamentación legal\" o \"competencia administrativa\")."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn formal(description: &str) -> Problem {
        Problem {
            category: ProblemCategory::Formal,
            description: description.into(),
            severity: Level::High,
            line: "N/A".into(),
            legal_basis: String::new(),
            impact: String::new(),
            short_recommendation: String::new(),
        }
    }

    #[test]
    fn analysis_uses_real_length() {
        let result = analysis("petición", today());
        assert_eq!(result.length, 8);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(result.keywords.len(), 5);
        assert_eq!(analysis("", today()).length, 0);
    }

    #[test]
    fn problems_are_complete() {
        let problems = problems();
        assert!(problems.len() >= 2);
        for p in &problems {
            assert!(!p.category.as_str().is_empty());
            assert!(!p.description.is_empty());
        }
    }

    #[test]
    fn formal_problem_adds_a_recommendation() {
        let recs = recommendations(&[formal("Sin radicado")], &AugmentationPolicy::default());
        assert_eq!(recs.len(), BASE_RECOMMENDATIONS.len() + 1);
        let derived = recs.last().unwrap();
        assert_eq!(derived.title, "Corregir problema formal: Sin radicado...");
        assert_eq!(derived.description, "Resolver el problema formal identificado: Sin radicado");
        assert_eq!(derived.priority, Level::Medium);
    }

    #[test]
    fn derived_title_quotes_a_prefix() {
        let long = "á".repeat(80);
        let recs = AugmentationPolicy::default().derive(&[formal(&long)]);
        assert_eq!(recs[0].title, format!("Corregir problema formal: {}...", "á".repeat(50)));
    }

    #[test]
    fn only_first_three_problems_are_considered() {
        let problems: Vec<Problem> = (0..5).map(|i| formal(&format!("p{i}"))).collect();
        assert_eq!(AugmentationPolicy::default().derive(&problems).len(), 3);
    }

    #[test]
    fn unmatched_categories_add_nothing() {
        let mut p = formal("x");
        p.category = ProblemCategory::Constitutional;
        assert!(AugmentationPolicy::default().derive(&[p.clone()]).is_empty());
        assert!(AugmentationPolicy::none().derive(&[formal("x")]).is_empty());
    }

    #[test]
    fn chat_keywords_match_whole_words_only() {
        let ctx = ChatContext::default();
        for question in ["¿Qué dice la leyenda del sello?", "mejoramiento continuo", "problemático"] {
            let answer = chat(question, &ctx);
            assert!(
                answer.starts_with("Para responder a tu pregunta"),
                "{question:?} matched a topic"
            );
        }
    }

    #[test]
    fn chat_picks_answer_by_keyword() {
        let ctx = ChatContext::default();
        assert_eq!(chat("¿Cómo mejorar?", &ctx), ANSWER_STRUCTURE);
        assert_eq!(chat("¿Qué RESOLUCIÓN aplica?", &ctx), ANSWER_NORMS);
        assert_eq!(chat("problemas urgentes", &ctx), ANSWER_CRITICAL);
        assert_eq!(chat("¿Cómo ejecutar esto?", &ctx), ANSWER_IMPLEMENTATION);
        assert_eq!(chat("¿Qué leyes cito?", &ctx), ANSWER_NORMS);
    }

    #[test]
    fn general_answer_reports_missing_stages() {
        let answer = chat("hola", &ChatContext::default());
        assert!(answer.contains("Análisis del documento: No disponible"));
        assert!(answer.contains("Recomendaciones: No disponibles"));

        let problems = problems();
        let ctx = ChatContext {
            analysis: None,
            problems: Some(&problems),
            recommendations: None,
        };
        assert!(chat("", &ctx).contains("Problemas identificados: Disponible (3 elementos)"));
    }
}
