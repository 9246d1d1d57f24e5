//! Brainbox retrieval client and the retrieval-augmented generator.
//!
//! Brainbox indexes reference material (laws, rulings, templates) in a "box".
//! [`RagGenerator`] fetches passages relevant to each task and appends them to
//! the prompt before delegating to an inner [`Generator`]. Retrieval problems
//! never fail the call: the prompt just says no documents were found.

use std::time::Duration;

use async_trait::async_trait;
use peticion_core::prompt::{Prompt, truncate_chars};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::client::Generator;
use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "https://app.brainbox.com.co/api/public/v1";
pub const DEFAULT_BOX_ID: &str = "f3737a7e-f05f-427b-9591-cdc6feb7c0a4";

/// Passages appended to a prompt.
pub const DEFAULT_MAX_DOCUMENTS: usize = 5;
/// Characters kept from each passage.
const PASSAGE_CHARS: usize = 500;
const NO_DOCUMENTS: &str = "No hay documentos relevantes disponibles.";

/// A retrieved passage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RetrievedDocument {
    /// Source label from `metadata.source`, then `metadata.fileName`.
    pub fn source(&self) -> &str {
        ["source", "fileName"]
            .iter()
            .find_map(|key| self.metadata.get(*key).and_then(Value::as_str))
            .unwrap_or("Documento")
    }
}

/// A file indexed in the box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxFile {
    pub id: Option<String>,
    #[serde(alias = "fileName", alias = "file_name")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
}

#[derive(Deserialize)]
struct RetrieveData {
    #[serde(default)]
    documents: Vec<DocumentGroup>,
}

#[derive(Deserialize)]
struct DocumentGroup {
    #[serde(default)]
    documents: Vec<RetrievedDocument>,
}

#[derive(Deserialize)]
struct FilesData {
    #[serde(default)]
    files: Vec<BoxFile>,
}

#[derive(Deserialize)]
struct SignedUrlData {
    #[serde(alias = "signedUrl")]
    signed_url: Option<String>,
}

#[derive(Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
}

/// HTTP client for one Brainbox box.
pub struct BrainboxClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    box_id: String,
}

impl BrainboxClient {
    pub fn new(
        api_key: String,
        box_id: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            box_id,
        })
    }

    pub fn box_id(&self) -> &str {
        &self.box_id
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ClientError> {
        let resp = request.bearer_auth(&self.api_key).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        Ok(resp.text().await?)
    }

    /// Retrieve passages for `query`, flattened from Brainbox's grouped results.
    pub async fn retrieve_documents(
        &self,
        query: &str,
    ) -> Result<Vec<RetrievedDocument>, ClientError> {
        let url = format!("{}/boxes/{}/retrieve-documents", self.base_url, self.box_id);
        info!(url = %url, "retrieving documents from brainbox");
        let raw = self
            .send(self.client.post(&url).json(&RetrieveRequest { query }))
            .await?;
        let envelope: Envelope<RetrieveData> = serde_json::from_str(&raw)?;
        let documents: Vec<RetrievedDocument> = match envelope {
            Envelope {
                success: true,
                data: Some(data),
            } => data.documents.into_iter().flat_map(|g| g.documents).collect(),
            _ => Vec::new(),
        };
        info!(count = documents.len(), "retrieved documents");
        Ok(documents)
    }

    /// List the files indexed in the box.
    pub async fn list_files(&self) -> Result<Vec<BoxFile>, ClientError> {
        let url = format!("{}/boxes/{}/files", self.base_url, self.box_id);
        info!(url = %url, "listing brainbox files");
        let raw = self.send(self.client.get(&url)).await?;
        let envelope: Envelope<FilesData> = serde_json::from_str(&raw)?;
        Ok(match envelope {
            Envelope {
                success: true,
                data: Some(data),
            } => data.files,
            _ => Vec::new(),
        })
    }

    /// Temporary download URL for one indexed file, `None` when the service has none.
    pub async fn signed_url(&self, file_id: &str) -> Result<Option<String>, ClientError> {
        let url = format!("{}/files/{}/signed-url", self.base_url, file_id);
        debug!(url = %url, "requesting signed file url");
        let raw = self.send(self.client.get(&url)).await?;
        let envelope: Envelope<SignedUrlData> = serde_json::from_str(&raw)?;
        Ok(match envelope {
            Envelope {
                success: true,
                data: Some(data),
            } => data.signed_url.filter(|u| !u.trim().is_empty()),
            _ => None,
        })
    }

    /// `GET /check`. `Ok(false)` means the service answered but reported trouble.
    pub async fn health_check(&self) -> Result<bool, ClientError> {
        let url = format!("{}/check", self.base_url);
        let raw = self.send(self.client.get(&url)).await?;
        let envelope: Envelope<Value> = serde_json::from_str(&raw)?;
        Ok(envelope.success)
    }
}

/// Render passages as a numbered context block.
pub fn build_context(documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS.to_string();
    }
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "Documento {} ({}, relevancia: {:.2}):\n{}...",
                i + 1,
                doc.source(),
                doc.score,
                truncate_chars(&doc.content, PASSAGE_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Generator that grounds prompts in retrieved Brainbox passages.
pub struct RagGenerator<G> {
    brainbox: BrainboxClient,
    inner: G,
    max_documents: usize,
}

impl<G: Generator> RagGenerator<G> {
    pub fn new(brainbox: BrainboxClient, inner: G) -> Self {
        Self {
            brainbox,
            inner,
            max_documents: DEFAULT_MAX_DOCUMENTS,
        }
    }

    pub fn with_max_documents(mut self, max_documents: usize) -> Self {
        self.max_documents = max_documents;
        self
    }

    async fn context_for(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return NO_DOCUMENTS.to_string();
        }
        match self.brainbox.retrieve_documents(query).await {
            Ok(mut documents) => {
                documents.truncate(self.max_documents);
                build_context(&documents)
            }
            Err(e) => {
                warn!(error = %e, "retrieval failed, continuing without documents");
                NO_DOCUMENTS.to_string()
            }
        }
    }
}

#[async_trait]
impl<G: Generator> Generator for RagGenerator<G> {
    fn name(&self) -> &str {
        "brainbox-rag"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ClientError> {
        let context = self.context_for(&prompt.retrieval_query).await;
        let mut grounded = prompt.clone();
        grounded.user = format!(
            "{}\n\nDOCUMENTOS DE REFERENCIA:\n{context}",
            prompt.user
        );
        self.inner.generate(&grounded).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::serve;
    use peticion_core::prompt::analysis_prompt;
    use serde_json::json;
    use std::sync::Mutex;

    fn client(base: &str) -> BrainboxClient {
        BrainboxClient::new(
            "bb-key".into(),
            "box-1".into(),
            base.into(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn doc(content: &str, score: f64, metadata: Value) -> RetrievedDocument {
        RetrievedDocument {
            content: content.into(),
            score,
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    struct Capture {
        last: Mutex<Option<Prompt>>,
    }

    #[async_trait]
    impl Generator for Capture {
        fn name(&self) -> &str {
            "capture"
        }

        async fn generate(&self, prompt: &Prompt) -> Result<String, ClientError> {
            *self.last.lock().unwrap() = Some(prompt.clone());
            Ok("ok".into())
        }
    }

    #[test]
    fn context_lists_source_and_score() {
        let docs = vec![
            doc("Artículo 23.", 0.914, json!({"source": "constitucion.pdf"})),
            doc("Ley 1755.", 0.5, json!({"fileName": "ley1755.pdf"})),
            doc("Sin origen.", 0.0, json!({})),
        ];
        let context = build_context(&docs);
        assert!(context.starts_with("Documento 1 (constitucion.pdf, relevancia: 0.91):\nArtículo 23...."));
        assert!(context.contains("Documento 2 (ley1755.pdf, relevancia: 0.50)"));
        assert!(context.contains("Documento 3 (Documento, relevancia: 0.00)"));
    }

    #[test]
    fn context_truncates_passages() {
        let context = build_context(&[doc(&"ñ".repeat(600), 1.0, json!({}))]);
        assert!(context.contains(&format!("{}...", "ñ".repeat(500))));
        assert!(!context.contains(&"ñ".repeat(501)));
    }

    #[test]
    fn empty_context_has_placeholder() {
        assert_eq!(build_context(&[]), NO_DOCUMENTS);
    }

    #[tokio::test]
    async fn retrieve_flattens_groups() {
        let body = json!({
            "success": true,
            "data": {"documents": [
                {"documents": [{"content": "a", "score": 0.9}, {"content": "b", "score": 0.8}]},
                {"documents": [{"content": "c", "score": 0.7}]},
                {"other": true}
            ]}
        });
        let (base, handle) = serve(vec![(200, body.to_string())]);
        let docs = client(&base).retrieve_documents("derecho de petición").await.unwrap();
        let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);

        let captured = handle.join().unwrap();
        assert_eq!(captured[0].url, "/boxes/box-1/retrieve-documents");
        assert_eq!(captured[0].authorization.as_deref(), Some("Bearer bb-key"));
        assert!(captured[0].body.contains("derecho de petición"));
    }

    #[tokio::test]
    async fn unsuccessful_envelope_yields_no_documents() {
        let (base, handle) = serve(vec![(200, r#"{"success": false}"#.into())]);
        assert!(client(&base).retrieve_documents("q").await.unwrap().is_empty());
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn list_files_reads_data_files() {
        let body = json!({"success": true, "data": {"files": [
            {"id": "f1", "fileName": "ley1437.pdf", "status": "indexed"}
        ]}});
        let (base, handle) = serve(vec![(200, body.to_string())]);
        let files = client(&base).list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name.as_deref(), Some("ley1437.pdf"));
        assert_eq!(files[0].extra["status"], "indexed");
        assert_eq!(handle.join().unwrap()[0].url, "/boxes/box-1/files");
    }

    #[tokio::test]
    async fn signed_url_reads_data_field() {
        let body = json!({"success": true, "data": {"signed_url": "https://cdn.example/ley1437.pdf?sig=1"}});
        let (base, handle) = serve(vec![(200, body.to_string())]);
        let url = client(&base).signed_url("f1").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://cdn.example/ley1437.pdf?sig=1"));
        let seen = handle.join().unwrap();
        assert_eq!(seen[0].url, "/files/f1/signed-url");
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer bb-key"));
    }

    #[tokio::test]
    async fn signed_url_absent_on_failure_envelope() {
        let (base, handle) = serve(vec![
            (200, r#"{"success": false}"#.into()),
            (200, r#"{"success": true, "data": {"signed_url": ""}}"#.into()),
        ]);
        let client = client(&base);
        assert_eq!(client.signed_url("f1").await.unwrap(), None);
        assert_eq!(client.signed_url("f2").await.unwrap(), None);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn health_check_reports_success_flag() {
        let (base, handle) = serve(vec![(200, r#"{"success": true}"#.into())]);
        assert!(client(&base).health_check().await.unwrap());
        assert_eq!(handle.join().unwrap()[0].url, "/check");
    }

    #[tokio::test]
    async fn rejected_key_is_auth() {
        let (base, handle) = serve(vec![(401, r#"{"error": "unauthorized"}"#.into())]);
        let err = client(&base).health_check().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn rag_appends_retrieved_passages() {
        let body = json!({"success": true, "data": {"documents": [
            {"documents": [{"content": "Ley 1755 de 2015", "score": 0.8, "metadata": {"source": "ley.pdf"}}]}
        ]}});
        let (base, handle) = serve(vec![(200, body.to_string())]);
        let rag = RagGenerator::new(client(&base), Capture { last: Mutex::new(None) });
        assert_eq!(rag.generate(&analysis_prompt("doc")).await.unwrap(), "ok");
        handle.join().unwrap();

        let sent = rag.inner.last.lock().unwrap().clone().unwrap();
        assert!(sent.user.contains("DOCUMENTOS DE REFERENCIA:"));
        assert!(sent.user.contains("Documento 1 (ley.pdf, relevancia: 0.80)"));
    }

    #[tokio::test]
    async fn rag_survives_retrieval_failure() {
        let rag = RagGenerator::new(
            client("http://127.0.0.1:1"),
            Capture { last: Mutex::new(None) },
        );
        assert_eq!(rag.generate(&analysis_prompt("doc")).await.unwrap(), "ok");
        let sent = rag.inner.last.lock().unwrap().clone().unwrap();
        assert!(sent.user.ends_with(NO_DOCUMENTS));
    }
}
