use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paperchat_core::ChatSession;
use paperchat_schema::{ChatError, ChatbotConfig};

/// Minimal single-page PDF containing `text`.
fn write_test_pdf(path: &Path, text: &str) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save pdf");
}

fn test_config(server: &MockServer) -> ChatbotConfig {
    let mut config = ChatbotConfig::new("test-key");
    config.embedding_dimensions = 3;
    config.chunk_size = Some(500);
    config.llm_base_url = server.uri();
    config.embedding_base_url = server.uri();
    config
}

async fn mount_embed(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": [{"values": [0.1, 0.2, 0.3]}]
        })))
        .mount(server)
        .await;
}

fn generate_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5}
    })
}

async fn mount_generate(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_response(text)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn single_page_pdf_end_to_end() {
    let server = MockServer::start().await;
    mount_embed(&server).await;
    mount_generate(&server, "The context states the capital of France is **Paris**.").await;

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("france.pdf");
    write_test_pdf(&pdf, "The capital of France is Paris.");

    let mut session = ChatSession::from_config(test_config(&server)).unwrap();

    let report = session.upload(&[pdf.as_path()]).await.unwrap();
    assert_eq!(report.documents_indexed, 1);
    assert_eq!(report.chunks_indexed, 1);
    assert!(report.failures.is_empty());

    let answer = session.ask("What is the capital of France?").await.unwrap();
    assert!(answer.contains("Paris"));
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn zero_byte_upload_reports_file_and_session_survives() {
    let server = MockServer::start().await;
    mount_embed(&server).await;
    mount_generate(&server, "Answer from the valid document.").await;

    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.pdf");
    std::fs::write(&empty, b"").unwrap();

    let mut session = ChatSession::from_config(test_config(&server)).unwrap();

    let report = session.upload(&[empty.as_path()]).await.unwrap();
    assert_eq!(report.documents_indexed, 0);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].to_string().contains("empty.pdf"));
    assert!(matches!(report.failures[0], ChatError::Input { .. }));

    // The session stays usable for a valid file afterwards.
    let valid = dir.path().join("valid.pdf");
    write_test_pdf(&valid, "Some perfectly fine document content.");
    let report = session.upload(&[valid.as_path()]).await.unwrap();
    assert_eq!(report.documents_indexed, 1);

    let answer = session.ask("What does the document say?").await.unwrap();
    assert!(answer.contains("valid document"));
}

#[tokio::test]
async fn mixed_batch_indexes_good_files_and_reports_bad_ones() {
    let server = MockServer::start().await;
    mount_embed(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.pdf");
    let bad = dir.path().join("bad.pdf");
    write_test_pdf(&good, "Useful content for the index.");
    std::fs::write(&bad, b"not a pdf at all").unwrap();

    let mut session = ChatSession::from_config(test_config(&server)).unwrap();
    let report = session
        .upload(&[bad.as_path(), good.as_path()])
        .await
        .unwrap();

    assert_eq!(report.documents_indexed, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].to_string().contains("bad.pdf"));
    assert!(session.has_documents());
}

#[tokio::test]
async fn failed_generation_is_retryable_and_leaves_memory_clean() {
    let server = MockServer::start().await;
    mount_embed(&server).await;

    // First generate call fails with a transient error, the retry succeeds.
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_generate(&server, "Recovered answer mentioning Paris.").await;

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("doc.pdf");
    write_test_pdf(&pdf, "The capital of France is Paris.");

    let mut session = ChatSession::from_config(test_config(&server)).unwrap();
    session.upload(&[pdf.as_path()]).await.unwrap();

    let err = session.ask("What is the capital of France?").await.unwrap_err();
    assert!(err.is_retryable());
    assert!(session.history().is_empty());

    let answer = session.ask("What is the capital of France?").await.unwrap();
    assert!(answer.contains("Paris"));
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn embed_failure_mid_batch_leaves_index_empty() {
    let server = MockServer::start().await;
    // The first document embeds fine; the second hits a transient failure.
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": [{"values": [0.1, 0.2, 0.3]}]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    write_test_pdf(&first, "Content of the first document.");
    write_test_pdf(&second, "Content of the second document.");

    let mut session = ChatSession::from_config(test_config(&server)).unwrap();
    let err = session
        .upload(&[first.as_path(), second.as_path()])
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    // The aborted batch must not leave the first document's chunks behind.
    assert!(!session.has_documents());
    assert_eq!(session.chunk_count(), 0);
}

#[tokio::test]
async fn embed_failure_fails_upload_but_not_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_embed(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("doc.pdf");
    write_test_pdf(&pdf, "Document body text.");

    let mut session = ChatSession::from_config(test_config(&server)).unwrap();

    let err = session.upload(&[pdf.as_path()]).await.unwrap_err();
    assert!(matches!(err, ChatError::Service { stage: "embed", .. }));
    assert!(err.is_retryable());

    // Retrying the same upload works once the service recovers.
    let report = session.upload(&[pdf.as_path()]).await.unwrap();
    assert_eq!(report.documents_indexed, 1);
}
