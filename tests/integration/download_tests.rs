//! Downloader and batch tests against a mock template endpoint

use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use template_harvest::config::HttpConfig;
use template_harvest::download::{build_http_client, run_batch, Downloader, RetryPolicy};
use template_harvest::output::write_manifest;
use template_harvest::records::{DownloadOutcome, DownloadTarget, FailureReason, FileType};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/api/File/DownTemplate";

fn downloader(server: &MockServer, out_dir: &TempDir) -> Downloader {
    let client = build_http_client(&HttpConfig::default(), None, None).unwrap();
    Downloader::new(
        client,
        Url::parse(&server.uri()).unwrap(),
        out_dir.path(),
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::ZERO,
            step: Duration::ZERO,
        },
    )
}

/// Serves every connection with `parts`, written one at a time with a pause
/// after each, and returns the server's base URL
///
/// Used where a response needs raw header bytes or a split body, which the
/// mock server cannot produce.
async fn raw_server(parts: Vec<Vec<u8>>, pause: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let parts = parts.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                for part in parts {
                    if socket.write_all(&part).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                    tokio::time::sleep(pause).await;
                }
            });
        }
    });

    format!("http://{}", addr)
}

fn raw_downloader(base: &str, out_dir: &TempDir) -> Downloader {
    let client = build_http_client(&HttpConfig::default(), None, None).unwrap();
    Downloader::new(
        client,
        Url::parse(base).unwrap(),
        out_dir.path(),
        RetryPolicy {
            max_retries: 0,
            base_delay: Duration::ZERO,
            step: Duration::ZERO,
        },
    )
}

fn target(title: &str, detail_url: Option<&str>) -> DownloadTarget {
    DownloadTarget::new(title, detail_url, "national")
}

#[tokio::test]
async fn test_pdf_signature_without_headers_is_saved() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let detail = format!("{}/View?id=abc", server.uri());

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("id", "abc"))
        .and(query_param("type", "2"))
        .and(header_exists("referer"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 body".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = downloader(&server, &out)
        .fetch(&target("Lease", Some(&detail)), &[FileType::Pdf])
        .await;

    let expected = out.path().join("national").join("Lease.pdf");
    assert_eq!(outcome, DownloadOutcome::Saved(vec![expected.clone()]));
    assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-1.4 body");
}

#[tokio::test]
async fn test_forbidden_is_retried_then_reported() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let detail = format!("{}/View?id=abc", server.uri());

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(403).set_body_string("<html>denied</html>"))
        .expect(3)
        .mount(&server)
        .await;

    let outcome = downloader(&server, &out)
        .fetch(&target("Lease", Some(&detail)), &[FileType::Pdf])
        .await;

    assert!(!outcome.is_ok());
    assert_eq!(outcome.info(), "fail_pdf:status 403");

    let debug = out.path().join("debug_html").join("abc_2_status403.html");
    assert_eq!(std::fs::read_to_string(debug).unwrap(), "<html>denied</html>");
    assert!(!out.path().join("national").join("Lease.pdf").exists());
}

#[tokio::test]
async fn test_retry_succeeds_after_server_error() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let detail = format!("{}/View?id=abc", server.uri());

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500).set_body_string("busy"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/msword")
                .set_body_bytes(b"legacy word".to_vec()),
        )
        .mount(&server)
        .await;

    let outcome = downloader(&server, &out)
        .fetch(&target("Lease", Some(&detail)), &[FileType::Word])
        .await;

    let expected = out.path().join("national").join("Lease.doc");
    assert_eq!(outcome, DownloadOutcome::Saved(vec![expected.clone()]));
    assert!(expected.exists());
    assert!(out
        .path()
        .join("debug_html")
        .join("abc_1_status500.html")
        .exists());
}

#[tokio::test]
async fn test_disposition_filename_sets_extension() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let detail = format!("{}/View?id=abc", server.uri());

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-disposition", "attachment; filename=\"contract.wps\"")
                .set_body_bytes(b"binary".to_vec()),
        )
        .mount(&server)
        .await;

    let outcome = downloader(&server, &out)
        .fetch(&target("Contract", Some(&detail)), &[FileType::Word])
        .await;

    assert_eq!(
        outcome.saved_paths(),
        &[out.path().join("national").join("Contract.wps")]
    );
}

#[tokio::test]
async fn test_duplicate_titles_never_overwrite() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .mount(&server)
        .await;

    let downloader = downloader(&server, &out);
    let first = format!("{}/View?id=a1", server.uri());
    let second = format!("{}/View?id=a2", server.uri());

    let first = downloader
        .fetch(&target("Sale: contract", Some(&first)), &[FileType::Pdf])
        .await;
    let second = downloader
        .fetch(&target("Sale/ contract", Some(&second)), &[FileType::Pdf])
        .await;

    let dir = out.path().join("national");
    assert_eq!(first.saved_paths(), &[dir.join("Sale_ contract.pdf")]);
    assert_eq!(second.saved_paths(), &[dir.join("Sale_ contract_a2.pdf")]);
}

#[tokio::test]
async fn test_one_failed_type_fails_the_record_but_keeps_files() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let detail = format!("{}/View?id=abc", server.uri());

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("type", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("type", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string("<html>login</html>"),
        )
        .expect(3)
        .mount(&server)
        .await;

    let outcome = downloader(&server, &out)
        .fetch(
            &target("Lease", Some(&detail)),
            &[FileType::Pdf, FileType::Word],
        )
        .await;

    let pdf = out.path().join("national").join("Lease.pdf");
    assert_eq!(
        outcome,
        DownloadOutcome::Failed {
            reasons: vec![FailureReason::Exhausted {
                file_type: FileType::Word,
                last_error: "not_binary_content".to_string(),
            }],
            saved: vec![pdf.clone()],
        }
    );
    assert!(pdf.exists());
    assert!(out
        .path()
        .join("debug_html")
        .join("abc_1_notbinary.html")
        .exists());
}

#[tokio::test]
async fn test_batch_reports_every_record_in_order() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let good = format!("{}/View?id=ok1", server.uri());

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("id", "ok1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let targets = vec![
        target("No link", None),
        target("Good", Some(&good)),
        target("No id", Some("https://portal.example/View")),
    ];
    let entries = run_batch(
        Arc::new(downloader(&server, &out)),
        targets.clone(),
        &[FileType::Pdf],
        2,
        &ProgressBar::hidden(),
    )
    .await;

    let titles: Vec<&str> = entries.iter().map(|e| e.target.title.as_str()).collect();
    assert_eq!(titles, vec!["No link", "Good", "No id"]);
    assert_eq!(entries[0].outcome.info(), "no_detail_url");
    assert!(entries[1].outcome.is_ok());
    assert_eq!(entries[2].outcome.info(), "no_id");

    let manifest = write_manifest(out.path(), &entries).unwrap();
    assert_eq!(manifest, out.path().join("download_results.csv"));

    let text = std::fs::read_to_string(&manifest).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "title,detail_url,section,ok,info");
    assert_eq!(lines[1], "No link,,national,false,no_detail_url");
    assert!(lines[2].starts_with(&format!("Good,{},national,true,", good)));
    assert!(lines[2].ends_with("Good.pdf"));
    assert_eq!(
        lines[3],
        "No id,https://portal.example/View,national,false,no_id"
    );
}

#[tokio::test]
async fn test_raw_utf8_disposition_names_the_extension() {
    let mut head = b"HTTP/1.1 200 OK\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: "
        .to_vec();
    head.extend_from_slice("attachment; filename=\"合同.docx\"".as_bytes());
    head.extend_from_slice(b"\r\nContent-Length: 7\r\nConnection: close\r\n\r\nPK\x03\x04doc");

    let base = raw_server(vec![head], Duration::ZERO).await;
    let out = TempDir::new().unwrap();
    let detail = format!("{}/View?id=abc", base);

    let outcome = raw_downloader(&base, &out)
        .fetch(&target("Lease", Some(&detail)), &[FileType::Word])
        .await;

    let expected = out.path().join("national").join("Lease.docx");
    assert_eq!(outcome, DownloadOutcome::Saved(vec![expected.clone()]));
    assert_eq!(std::fs::read(&expected).unwrap(), b"PK\x03\x04doc");
}

#[tokio::test]
async fn test_pdf_signature_split_across_chunks_is_saved() {
    let parts = vec![
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n2\r\n%P\r\n"
            .to_vec(),
        b"6\r\nDF-1.4\r\n0\r\n\r\n".to_vec(),
    ];
    let base = raw_server(parts, Duration::from_millis(100)).await;
    let out = TempDir::new().unwrap();
    let detail = format!("{}/View?id=abc", base);

    let outcome = raw_downloader(&base, &out)
        .fetch(&target("Lease", Some(&detail)), &[FileType::Pdf])
        .await;

    let expected = out.path().join("national").join("Lease.pdf");
    assert_eq!(outcome, DownloadOutcome::Saved(vec![expected.clone()]));
    assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-1.4");
}

#[tokio::test]
async fn test_batch_reports_records_as_they_finish() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let slow = format!("{}/View?id=slow", server.uri());
    let fast = format!("{}/View?id=fast", server.uri());

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("id", "slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec())
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("id", "fast"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .mount(&server)
        .await;

    let progress = ProgressBar::hidden();
    let batch = tokio::spawn({
        let downloader = Arc::new(downloader(&server, &out));
        let targets = vec![target("Slow", Some(&slow)), target("Fast", Some(&fast))];
        let progress = progress.clone();
        async move { run_batch(downloader, targets, &[FileType::Pdf], 2, &progress).await }
    });

    tokio::time::timeout(Duration::from_millis(1000), async {
        while progress.position() < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("fast record should be reported while the slow one runs");
    assert!(!batch.is_finished());

    let entries = batch.await.unwrap();
    let titles: Vec<&str> = entries.iter().map(|e| e.target.title.as_str()).collect();
    assert_eq!(titles, vec!["Slow", "Fast"]);
    assert!(entries.iter().all(|e| e.outcome.is_ok()));
    assert_eq!(progress.position(), 2);
}
