//! End-to-end tests for pdf2xml.
//!
//! Each test starts a throwaway HTTP server on a loopback port and runs the
//! full pipeline against it, so no network access is needed. Text
//! extraction is replaced by a fake that reads the payload as UTF-8, which
//! keeps the documents readable in the test source.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use async_trait::async_trait;
use bytes::Bytes;
use pdf2xml::{
    convert, ConversionProgressCallback, ConversionRecord, ConversionRequest, ConversionStatus,
    ConversionStore, ConvertError, Converter, ConverterConfig, MemoryStore, PipelineState,
    RawDocument, StoreConfig, StructureLevel, TextExtractor,
};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// ── Test server ──────────────────────────────────────────────────────────────

/// What the test server answers to every request.
#[derive(Clone)]
enum Reply {
    /// 200 with `Content-Length`.
    Body(Vec<u8>),
    /// 200 without `Content-Length`; the body ends when the connection closes.
    Unsized(Vec<u8>),
    /// Bare status code with an empty body.
    Status(u16),
    /// Accept the request and say nothing for this long.
    Stall(Duration),
}

struct TestServer {
    base: String,
    /// Request targets (path + query) in arrival order.
    requests: Arc<Mutex<Vec<String>>>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl TestServer {
    async fn start(reply: Reply) -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle(stream, reply.clone(), seen.clone()));
            }
        });

        Self {
            base: format!("http://{addr}"),
            requests,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle(mut stream: TcpStream, reply: Reply, seen: Arc<Mutex<Vec<String>>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let head = String::from_utf8_lossy(&buf);
    if let Some(target) = head.split_whitespace().nth(1) {
        seen.lock().unwrap().push(target.to_string());
    }

    let response = match reply {
        Reply::Body(body) => {
            let mut r = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .into_bytes();
            r.extend_from_slice(&body);
            r
        }
        Reply::Unsized(body) => {
            let mut r = b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nConnection: close\r\n\r\n"
                .to_vec();
            r.extend_from_slice(&body);
            r
        }
        Reply::Status(code) => format!(
            "HTTP/1.1 {code} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        )
        .into_bytes(),
        Reply::Stall(d) => {
            tokio::time::sleep(d).await;
            return;
        }
    };
    let _ = stream.write_all(&response).await;
    let _ = stream.shutdown().await;
}

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Reads the payload as UTF-8 text and counts its calls.
#[derive(Default)]
struct FakeExtractor {
    calls: AtomicUsize,
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<RawDocument, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        String::from_utf8(bytes.to_vec())
            .map(RawDocument::new)
            .map_err(|e| ConvertError::UnparsablePdf {
                detail: e.to_string(),
            })
    }
}

fn converter_with(config: ConverterConfig) -> (Converter, Arc<FakeExtractor>) {
    let extractor = Arc::new(FakeExtractor::default());
    let converter = Converter::with_extractor(&config, extractor.clone()).unwrap();
    (converter, extractor)
}

fn converter() -> (Converter, Arc<FakeExtractor>) {
    converter_with(ConverterConfig::default())
}

/// Parse `xml` and return `(element name, text)` pairs for leaf elements,
/// panicking if it is not well-formed.
fn leaf_elements(xml: &str) -> Vec<(String, String)> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut out = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(String::from_utf8(e.name().as_ref().to_vec()).unwrap());
                text.clear();
            }
            Ok(Event::Text(t)) => text.push_str(&t.unescape().unwrap()),
            Ok(Event::End(e)) => {
                let name = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                assert_eq!(stack.pop().as_deref(), Some(name.as_str()), "in {xml}");
                if !text.trim().is_empty() {
                    out.push((name, text.trim().to_string()));
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("not well-formed: {e}\n{xml}"),
        }
    }
    assert!(stack.is_empty(), "unclosed: {stack:?}");
    out
}

const INTRO: &[u8] = b"1. Introduction\n\nThis is text.";

// ── Successful conversions ───────────────────────────────────────────────────

#[tokio::test]
async fn test_basic_conversion_over_http() {
    let server = TestServer::start(Reply::Body(INTRO.to_vec())).await;
    let (converter, extractor) = converter();

    let result = converter
        .convert(ConversionRequest::new(
            server.url("/files/intro.pdf"),
            StructureLevel::Basic,
        ))
        .await;

    assert_eq!(result.status, ConversionStatus::Completed, "{result:?}");
    assert_eq!(result.page_count, 1);
    assert!(result.error.is_none());
    assert!(result.xml.contains("<paragraph id=\"p1\">1. Introduction</paragraph>"));
    assert!(result.xml.contains("<paragraph id=\"p2\">This is text.</paragraph>"));
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.requests(), vec!["/files/intro.pdf".to_string()]);
}

#[tokio::test]
async fn test_advanced_conversion_over_http() {
    let server = TestServer::start(Reply::Body(INTRO.to_vec())).await;
    let (converter, _) = converter();

    let result = converter
        .convert(ConversionRequest::new(
            server.url("/intro.pdf"),
            StructureLevel::Advanced,
        ))
        .await;

    assert!(result.is_completed());
    assert!(result.xml.contains("<section id=\"s1\">"));
    assert_eq!(
        leaf_elements(&result.xml),
        vec![
            ("heading".to_string(), "1. Introduction".to_string()),
            ("paragraph".to_string(), "This is text.".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unsized_body_within_cap() {
    let server = TestServer::start(Reply::Unsized(b"one\n\ntwo\n\nthree".to_vec())).await;
    let (converter, _) = converter();

    let result = converter
        .convert(ConversionRequest::new(server.url("/a.pdf"), StructureLevel::Basic))
        .await;

    assert!(result.is_completed(), "{result:?}");
    assert_eq!(leaf_elements(&result.xml).len(), 3);
}

#[tokio::test]
async fn test_text_without_separators_is_one_paragraph() {
    let server = TestServer::start(Reply::Body(b"line one\nline two\nline three".to_vec())).await;
    let (converter, _) = converter();

    for level in [StructureLevel::Basic, StructureLevel::Advanced] {
        let result = converter
            .convert(ConversionRequest::new(server.url("/a.pdf"), level))
            .await;
        assert_eq!(result.xml.matches("<paragraph ").count(), 1, "{level}");
    }
}

#[tokio::test]
async fn test_reserved_characters_survive_round_trip() {
    let body = "Terms & Conditions\n\nif a < b && c > d then \"ok\"\u{C}\n\n</document>".as_bytes();
    let server = TestServer::start(Reply::Body(body.to_vec())).await;
    let (converter, _) = converter();

    let result = converter
        .convert(ConversionRequest::new(server.url("/a.pdf"), StructureLevel::Advanced))
        .await;

    assert!(result.is_completed());
    let texts: Vec<_> = leaf_elements(&result.xml).into_iter().map(|(_, t)| t).collect();
    assert_eq!(
        texts,
        vec![
            "Terms & Conditions",
            "if a < b && c > d then \"ok\"",
            "</document>"
        ]
    );
}

#[tokio::test]
async fn test_conversion_is_deterministic() {
    let body = b"Overview\n\nfirst body\n\nDetails\n\nsecond body".to_vec();
    let server = TestServer::start(Reply::Body(body)).await;
    let (converter, _) = converter();
    let request = ConversionRequest::new(server.url("/a.pdf"), StructureLevel::Advanced);

    let a = converter.convert(request.clone()).await;
    let b = converter.convert(request).await;
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_concurrent_conversions_are_independent() {
    let server = TestServer::start(Reply::Body(INTRO.to_vec())).await;
    let (converter, extractor) = converter();

    let mut handles = Vec::new();
    for i in 0..8 {
        let c = converter.clone();
        let url = server.url(&format!("/doc{i}.pdf"));
        handles.push(tokio::spawn(async move {
            c.convert(ConversionRequest::new(url, StructureLevel::Advanced))
                .await
        }));
    }

    let mut outputs = Vec::new();
    for h in handles {
        outputs.push(h.await.unwrap());
    }
    assert!(outputs.iter().all(|r| r.is_completed()));
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 8);
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_404_yields_fallback() {
    let server = TestServer::start(Reply::Status(404)).await;
    let (converter, extractor) = converter();

    let result = converter
        .convert(ConversionRequest::new(server.url("/missing.pdf"), StructureLevel::Basic))
        .await;

    assert_eq!(result.status, ConversionStatus::Failed);
    assert_eq!(result.page_count, 0);
    assert!(result.xml.starts_with("<document><error>"));
    assert!(result.xml.ends_with("</error></document>"));
    assert!(result.xml.contains("404"));
    assert_eq!(leaf_elements(&result.xml)[0].0, "error");
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_declared_oversize_aborts_before_extraction() {
    let server = TestServer::start(Reply::Body(vec![b'a'; 4096])).await;
    let config = ConverterConfig::builder().max_download_bytes(1024).build().unwrap();
    let (converter, extractor) = converter_with(config);

    let result = converter
        .convert(ConversionRequest::new(server.url("/big.pdf"), StructureLevel::Basic))
        .await;

    assert_eq!(result.status, ConversionStatus::Failed);
    assert!(result.error.as_deref().unwrap().contains("too large"));
    assert!(result.xml.contains("too large"));
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_streamed_oversize_aborts_before_extraction() {
    let server = TestServer::start(Reply::Unsized(vec![b'a'; 64 * 1024])).await;
    let config = ConverterConfig::builder().max_download_bytes(1024).build().unwrap();
    let (converter, extractor) = converter_with(config);

    let result = converter
        .convert(ConversionRequest::new(server.url("/big.pdf"), StructureLevel::Basic))
        .await;

    assert_eq!(result.status, ConversionStatus::Failed);
    assert!(result.xml.contains("too large"), "{}", result.xml);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fetch_timeout_fails_within_bound() {
    let server = TestServer::start(Reply::Stall(Duration::from_secs(10))).await;
    let config = ConverterConfig::builder().fetch_timeout_secs(1).build().unwrap();
    let (converter, extractor) = converter_with(config);

    let start = Instant::now();
    let result = converter
        .convert(ConversionRequest::new(server.url("/slow.pdf"), StructureLevel::Basic))
        .await;

    assert!(start.elapsed() < Duration::from_secs(5), "took {:?}", start.elapsed());
    assert_eq!(result.status, ConversionStatus::Failed);
    assert!(result.xml.contains("timed out"), "{}", result.xml);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_connection_refused_yields_fallback() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap().port()
    };
    let (converter, _) = converter();

    let result = converter
        .convert(ConversionRequest::new(
            format!("http://127.0.0.1:{port}/a.pdf"),
            StructureLevel::Basic,
        ))
        .await;

    assert_eq!(result.status, ConversionStatus::Failed);
    assert!(result.xml.contains("Download failed"), "{}", result.xml);
}

#[tokio::test]
async fn test_invalid_location_never_fetches() {
    let (converter, extractor) = converter();
    for location in ["", "not a url", "ftp://example.com/a.pdf", "/tmp/a.pdf"] {
        let result = converter
            .convert(ConversionRequest::new(location, StructureLevel::Basic))
            .await;
        assert_eq!(result.status, ConversionStatus::Failed, "{location:?}");
        assert!(result.xml.contains("Invalid source location"), "{}", result.xml);
        leaf_elements(&result.xml);
    }
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_default_extractor_rejects_non_pdf() {
    let server = TestServer::start(Reply::Body(b"<html>not a pdf</html>".to_vec())).await;

    let result = convert(
        server.url("/a.pdf"),
        StructureLevel::Basic,
        &ConverterConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.status, ConversionStatus::Failed);
    assert!(result.xml.contains("Unparsable PDF"), "{}", result.xml);
}

// ── Content store ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_store_location_is_fetched_through_signed_url() {
    let server = TestServer::start(Reply::Body(INTRO.to_vec())).await;
    let mut store = StoreConfig::new("demo", "key123", "secret");
    store.host = "127.0.0.1".into();
    store.api_base = server.base.clone();
    let config = ConverterConfig::builder().store(store).build().unwrap();
    let (converter, _) = converter_with(config);

    let result = converter
        .convert(ConversionRequest::new(
            server.url("/demo/raw/upload/v1712/pdf-converter/report.pdf"),
            StructureLevel::Basic,
        ))
        .await;

    assert!(result.is_completed(), "{result:?}");
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let target = &requests[0];
    assert!(target.starts_with("/v1_1/demo/raw/download?"), "{target}");
    assert!(target.contains("api_key=key123"));
    assert!(target.contains("public_id=v1712%2Fpdf-converter%2Freport"));
    assert!(target.contains("signature="));
    assert!(!target.contains("secret"));
}

// ── Progress, output files, records ──────────────────────────────────────────

#[derive(Default)]
struct StateLog {
    states: Mutex<Vec<PipelineState>>,
}

impl ConversionProgressCallback for StateLog {
    fn on_state(&self, state: PipelineState) {
        self.states.lock().unwrap().push(state);
    }
}

#[tokio::test]
async fn test_progress_reports_every_state() {
    let server = TestServer::start(Reply::Body(INTRO.to_vec())).await;
    let log = Arc::new(StateLog::default());
    let config = ConverterConfig::builder()
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let (converter, _) = converter_with(config);

    converter
        .convert(ConversionRequest::new(server.url("/a.pdf"), StructureLevel::Basic))
        .await;

    assert_eq!(
        *log.states.lock().unwrap(),
        vec![
            PipelineState::Idle,
            PipelineState::Locating,
            PipelineState::Fetching,
            PipelineState::Extracting,
            PipelineState::Segmenting,
            PipelineState::Serializing,
            PipelineState::Completed,
        ]
    );
}

#[tokio::test]
async fn test_convert_to_file_writes_xml() {
    let server = TestServer::start(Reply::Body(INTRO.to_vec())).await;
    let (converter, _) = converter();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/intro.xml");

    let result = converter
        .convert_to_file(
            ConversionRequest::new(server.url("/a.pdf"), StructureLevel::Advanced),
            &path,
        )
        .await
        .unwrap();

    assert!(result.is_completed());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), result.xml);
}

#[tokio::test]
async fn test_failed_conversion_is_recorded() {
    let server = TestServer::start(Reply::Status(500)).await;
    let (converter, _) = converter();
    let source = server.url("/broken.pdf");

    let result = converter
        .convert(ConversionRequest::new(source.as_str(), StructureLevel::Basic))
        .await;

    let store = MemoryStore::new();
    let id = store
        .save(ConversionRecord::new("alice", "broken.pdf", source, &result))
        .await
        .unwrap();

    let records = store.find_all_by_owner("alice").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, Some(id));
    assert_eq!(records[0].status, ConversionStatus::Failed);
    assert!(records[0].xml.contains("500"));
}
