use std::time::Duration;

use docsweep_core::SizePolicy;
use docsweep_engine::{DocumentKind, FailureKind, FetchSettings, Fetcher, ReqwestFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MIB: usize = 1024 * 1024;

async fn serve(route: &str, template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn one_mib_document_is_returned() {
    let body = vec![b'a'; MIB];
    let server = serve(
        "/files/offer.pdf",
        ResponseTemplate::new(200).set_body_raw(body.clone(), "application/pdf"),
    )
    .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/files/offer.pdf", server.uri());
    let doc = fetcher.fetch(&url).await.expect("fetch ok");

    assert_eq!(doc.bytes.len(), MIB);
    assert_eq!(doc.kind, Some(DocumentKind::Pdf));
    assert_eq!(doc.metadata.original_url, url);
    assert_eq!(doc.metadata.declared_len, Some(MIB as u64));
    assert_eq!(doc.metadata.redirect_count, 0);
}

#[tokio::test]
async fn five_mib_document_is_rejected() {
    let server = serve(
        "/big.pdf",
        ResponseTemplate::new(200).set_body_raw(vec![b'a'; 5 * MIB], "application/pdf"),
    )
    .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher
        .fetch(&format!("{}/big.pdf", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 3 * MIB as u64,
            actual: Some(5 * MIB as u64)
        }
    );
}

#[tokio::test]
async fn not_found_fails_regardless_of_length() {
    let server = serve(
        "/missing.pdf",
        ResponseTemplate::new(404).set_body_string("tiny"),
    )
    .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher
        .fetch(&format!("{}/missing.pdf", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = serve(
        "/slow.rtf",
        ResponseTemplate::new(200)
            .set_delay(Duration::from_millis(250))
            .set_body_string("slow"),
    )
    .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher
        .fetch(&format!("{}/slow.rtf", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn strict_policy_still_admits_declared_small_bodies() {
    let server = serve(
        "/table.csv",
        ResponseTemplate::new(200).set_body_raw("a;b\n1;2\n", "text/csv"),
    )
    .await;

    let settings = FetchSettings {
        size_policy: SizePolicy::Strict,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let doc = fetcher
        .fetch(&format!("{}/table.csv", server.uri()))
        .await
        .expect("fetch ok");
    assert_eq!(&doc.bytes[..], b"a;b\n1;2\n");
    assert_eq!(doc.kind, Some(DocumentKind::Csv));
}

#[tokio::test]
async fn malformed_url_is_rejected_before_any_request() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher.fetch("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

async fn redirect(server: &MockServer, from: &str, to: &str) {
    Mock::given(method("GET"))
        .and(path(from))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", to))
        .mount(server)
        .await;
}

#[tokio::test]
async fn redirects_up_to_the_limit_are_followed_and_counted() {
    let server = serve("/final.pdf", ResponseTemplate::new(200).set_body_string("pdf")).await;
    redirect(&server, "/first", "/second").await;
    redirect(&server, "/second", "/final.pdf").await;

    let settings = FetchSettings {
        redirect_limit: 2,
        ..FetchSettings::default()
    };
    let doc = ReqwestFetcher::new(settings)
        .fetch(&format!("{}/first", server.uri()))
        .await
        .expect("fetch ok");
    assert_eq!(doc.metadata.redirect_count, 2);
    assert_eq!(doc.metadata.final_url, format!("{}/final.pdf", server.uri()));
}

#[tokio::test]
async fn redirect_chain_longer_than_the_limit_fails() {
    let server = serve("/final.pdf", ResponseTemplate::new(200).set_body_string("pdf")).await;
    redirect(&server, "/first", "/second").await;
    redirect(&server, "/second", "/final.pdf").await;

    let settings = FetchSettings {
        redirect_limit: 1,
        ..FetchSettings::default()
    };
    let err = ReqwestFetcher::new(settings)
        .fetch(&format!("{}/first", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::RedirectLimitExceeded);
}
