//! Terminal rendering for wizard results.
//!
//! Analysis is shown as a vertical card; problems and recommendations as
//! numbered lists with aligned fields. Empty fields are skipped.

use peticion_ai::{Backend, BoxFile, ClientError, ErrorKind, Outcome, Source};
use peticion_core::{AnalysisResult, ChatTurn, Problem, Recommendation};

const LABEL_WIDTH: usize = 22;
const MAX_KEYWORDS: usize = 10;

// ── Wizard stages ──

pub fn print_analysis_card(analysis: &AnalysisResult, source: Source) {
    println!("=== Análisis del documento {} ===", source_tag(source));
    field("Tipo", &analysis.document_type);
    field("Longitud", &format!("{} caracteres", analysis.length));
    field("Confianza", &percent(analysis.confidence));
    field("Fecha", &analysis.analysis_date.format("%Y-%m-%d").to_string());
    let keywords: Vec<&str> = analysis
        .keywords
        .iter()
        .take(MAX_KEYWORDS)
        .map(String::as_str)
        .collect();
    field("Palabras clave", &keywords.join(", "));
    if analysis.keywords.len() > MAX_KEYWORDS {
        println!("  {:<LABEL_WIDTH$} ... and {} more", "", analysis.keywords.len() - MAX_KEYWORDS);
    }
    if !analysis.narrative.trim().is_empty() {
        println!();
        println!("{}", analysis.narrative.trim());
    }
    println!();
}

pub fn print_problems(problems: &[Problem], source: Source) {
    println!("=== Problemas detectados: {} {} ===", problems.len(), source_tag(source));
    if problems.is_empty() {
        println!("  No se detectaron problemas.");
    }
    for (i, p) in problems.iter().enumerate() {
        println!("{}. [{}] {} ({})", i + 1, p.severity, p.description, p.category);
        field("Línea", &p.line);
        field("Fundamento legal", &p.legal_basis);
        field("Impacto", &p.impact);
        field("Recomendación", &p.short_recommendation);
    }
    println!();
}

pub fn print_recommendations(recommendations: &[Recommendation], source: Source) {
    println!(
        "=== Recomendaciones: {} {} ===",
        recommendations.len(),
        source_tag(source)
    );
    for (i, r) in recommendations.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, r.priority, r.title);
        field("Descripción", &r.description);
        field("Acción", &r.action);
        field("Fundamento legal", &r.legal_basis);
        field("Tiempo estimado", &r.estimated_time);
        field("Recursos", &r.resources_needed);
        field("Impacto esperado", &r.expected_impact);
        field("Riesgos", &r.risks);
    }
    println!();
}

pub fn print_chat_turn(turn: &ChatTurn, source: Source) {
    println!("> {}", turn.question);
    println!("{}", turn.answer);
    if source == Source::Fallback {
        println!("  (respuesta predefinida)");
    }
    println!();
}

/// Print the outcome's notice, if any, to stderr.
pub fn print_notice<T>(outcome: &Outcome<T>) {
    if let Some(notice) = &outcome.notice {
        eprintln!("AVISO: {}", notice.message);
    }
}

// ── Provider checks ──

pub fn backend_label(backend: Backend) -> &'static str {
    match backend {
        Backend::Rag => "Gemini + Brainbox retrieval",
        Backend::Gemini => "Gemini",
        Backend::Heuristic => "local heuristic (no API key)",
    }
}

/// One line per provider: `None` means not configured.
pub fn print_check(provider: &str, result: Option<&Result<(), ClientError>>) {
    match result {
        None => println!("  {provider:<10} not configured"),
        Some(Ok(())) => println!("  {provider:<10} ok"),
        Some(Err(e)) => println!("  {provider:<10} {}: {e}", check_label(e)),
    }
}

fn check_label(error: &ClientError) -> &'static str {
    match error.kind() {
        ErrorKind::Auth => "invalid key",
        ErrorKind::Quota => "quota exceeded",
        ErrorKind::Transport => "network error",
        ErrorKind::Malformed => "unexpected response",
    }
}

pub fn print_files(files: &[BoxFile]) {
    println!("=== Archivos en la caja: {} ===", files.len());
    for file in files {
        let name = file.name.as_deref().unwrap_or("(sin nombre)");
        match &file.id {
            Some(id) => println!("  {name:<40} {id}"),
            None => println!("  {name}"),
        }
    }
}

pub fn print_signed_url(file_id: &str, url: Option<&str>) {
    println!("  {file_id:<40} {}", url.unwrap_or("(sin URL)"));
}

// ── Helpers ──

fn field(label: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    println!("  {label:<LABEL_WIDTH$} {value}");
}

fn source_tag(source: Source) -> &'static str {
    match source {
        Source::Model => "",
        Source::Fallback => "(predefinido)",
    }
}

fn percent(confidence: f64) -> String {
    format!("{:.0}%", confidence.clamp(0.0, 1.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(percent(0.756), "76%");
        assert_eq!(percent(1.4), "100%");
        assert_eq!(percent(0.0), "0%");
    }

    #[test]
    fn check_labels_follow_error_kind() {
        assert_eq!(check_label(&ClientError::from_status(403, String::new())), "invalid key");
        assert_eq!(check_label(&ClientError::from_status(429, String::new())), "quota exceeded");
        assert_eq!(check_label(&ClientError::Transport("refused".into())), "network error");
        assert_eq!(check_label(&ClientError::EmptyResponse), "unexpected response");
    }
}
