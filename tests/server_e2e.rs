//! End-to-end tests: real server, wiremock search backend and pages, and the
//! synthetic client.

use gleaner::server::{ErrorResponse, HealthResponse};
use gleaner::{SearchClient, SearchServer, ServerConfig};
use gleaner_search::{BackendKind, Passage, SearchResponse};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn results_page(links: &[(&str, String)]) -> String {
    let mut html = String::from("<!DOCTYPE html><html><body>");
    for (title, href) in links {
        html.push_str(&format!(
            r#"<div class="result results_links results_links_deep web-result">
  <a class="result__a" href="{href}">{title}</a>
  <a class="result__snippet" href="{href}">About {title}</a>
</div>"#
        ));
    }
    html.push_str("</body></html>");
    html
}

fn page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>{title}</title></head><body>{body}</body></html>"),
        "text/html; charset=utf-8",
    )
}

fn config_for(mock: &MockServer, kind: BackendKind) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.server.host = "127.0.0.1".into();
    config.server.port = 0;
    config.server.max_results = 10;
    config.backend.kind = kind;
    config.backend.scrape_endpoint = format!("{}/html/", mock.uri());
    config.backend.page_delay_ms = 0;
    config.backend.timeout_secs = 2;
    config.pipeline.fetch_timeout_secs = 1;
    config
}

/// Mount a DuckDuckGo result page linking to `/pages/{name}` for each entry,
/// plus the pages themselves.
async fn mount_site(mock: &MockServer, pages: &[(&str, ResponseTemplate)]) {
    let links: Vec<(&str, String)> = pages
        .iter()
        .map(|(name, _)| (*name, format!("{}/pages/{name}", mock.uri())))
        .collect();
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&links)))
        .mount(mock)
        .await;
    for (name, template) in pages {
        Mock::given(method("GET"))
            .and(path(format!("/pages/{name}")))
            .respond_with(template.clone())
            .mount(mock)
            .await;
    }
}

#[tokio::test]
async fn client_receives_filtered_passages() {
    let mock = MockServer::start().await;
    mount_site(
        &mock,
        &[
            ("a", page("Ownership", "<p>text1</p>")),
            ("b", ResponseTemplate::new(500)),
            ("c", page("Copy", "<p>text1</p>")),
            ("d", page("Borrowing", "<p>text2</p>")),
        ],
    )
    .await;

    let server = SearchServer::start(&config_for(&mock, BackendKind::Scrape))
        .await
        .expect("start");
    let client = SearchClient::new(server.url()).expect("client");
    let response = client.search("rust ownership", 2).await.expect("search");

    assert_eq!(
        response.response,
        vec![
            Passage::new(format!("{}/pages/a", mock.uri()), "Ownership", "text1"),
            Passage::new(format!("{}/pages/d", mock.uri()), "Borrowing", "text2"),
        ]
    );
}

#[tokio::test]
async fn partial_answer_when_few_pages_load() {
    let mock = MockServer::start().await;
    mount_site(
        &mock,
        &[
            ("a", page("A", "<p>alpha</p>")),
            ("b", ResponseTemplate::new(404)),
            ("c", page("C", "<p>gamma</p>")),
            ("d", page("D", "")),
        ],
    )
    .await;

    let server = SearchServer::start(&config_for(&mock, BackendKind::Scrape))
        .await
        .expect("start");
    let client = SearchClient::new(server.url()).expect("client");
    let response = client.search("anything", 5).await.expect("search");

    assert_eq!(response.len(), 2);
    assert_eq!(response.response[0].content, "alpha");
    assert_eq!(response.response[1].content, "gamma");
}

#[tokio::test]
async fn response_is_json_with_wire_field_order() {
    let mock = MockServer::start().await;
    mount_site(&mock, &[("a", page("Ownership", "<p>text1</p>"))]).await;

    let server = SearchServer::start(&config_for(&mock, BackendKind::Scrape))
        .await
        .expect("start");
    let response = reqwest::Client::new()
        .post(format!("{}/", server.url()))
        .form(&[("q", "rust"), ("n", "1")])
        .send()
        .await
        .expect("send");

    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(content_type.starts_with("application/json"));

    let body = response.text().await.expect("body");
    let expected = format!(
        r#"{{"response":[{{"url":"{}/pages/a","title":"Ownership","content":"text1"}}]}}"#,
        mock.uri()
    );
    assert_eq!(body, expected);
}

#[tokio::test]
async fn malformed_requests_get_400() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&[])))
        .expect(0)
        .mount(&mock)
        .await;

    let server = SearchServer::start(&config_for(&mock, BackendKind::Scrape))
        .await
        .expect("start");
    let http = reqwest::Client::new();

    for body in ["n=2", "q=rust", "q=rust&n=zero", "q=rust&n=0", "q=a&q=b&n=1"] {
        let response = http
            .post(format!("{}/", server.url()))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("send");
        assert_eq!(response.status(), 400, "{body}");
        let error: ErrorResponse = response.json().await.expect("error body");
        assert!(error.error.starts_with("bad request"), "{body}: {}", error.error);
    }
}

#[tokio::test]
async fn latin1_form_body_decoded() {
    let mock = MockServer::start().await;
    mount_site(&mock, &[("a", page("Caf\u{e9}", "<p>Cr\u{e8}me</p>"))]).await;

    let server = SearchServer::start(&config_for(&mock, BackendKind::Scrape))
        .await
        .expect("start");
    let response = reqwest::Client::new()
        .post(format!("{}/", server.url()))
        .header("content-type", "application/x-www-form-urlencoded; charset=ISO-8859-1")
        .body(b"q=caf\xe9&n=1".to_vec())
        .send()
        .await
        .expect("send");

    assert_eq!(response.status(), 200);
    let parsed: SearchResponse = response.json().await.expect("json");
    assert_eq!(parsed.len(), 1);
}

#[tokio::test]
async fn backend_outage_is_502() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock)
        .await;

    let server = SearchServer::start(&config_for(&mock, BackendKind::Scrape))
        .await
        .expect("start");
    let response = reqwest::Client::new()
        .post(format!("{}/", server.url()))
        .form(&[("q", "rust"), ("n", "2")])
        .send()
        .await
        .expect("send");

    assert_eq!(response.status(), 502);
    let error: ErrorResponse = response.json().await.expect("error body");
    assert!(error.error.contains("503"));
}

#[tokio::test]
async fn description_backend_answers_from_snippets() {
    let mock = MockServer::start().await;
    let links = vec![("Ownership", format!("{}/pages/a", mock.uri()))];
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&links)))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .respond_with(page("never", "never"))
        .expect(0)
        .mount(&mock)
        .await;

    let server = SearchServer::start(&config_for(&mock, BackendKind::Description))
        .await
        .expect("start");
    let client = SearchClient::new(server.url()).expect("client");
    let response = client.search("rust", 3).await.expect("search");

    assert_eq!(
        response.response,
        vec![Passage::new(format!("{}/pages/a", mock.uri()), "Ownership", "About Ownership")]
    );
}

#[tokio::test]
async fn health_reports_backend() {
    let mock = MockServer::start().await;
    let server = SearchServer::start(&config_for(&mock, BackendKind::Description))
        .await
        .expect("start");

    let health: HealthResponse = reqwest::get(format!("{}/health", server.url()))
        .await
        .expect("get")
        .json()
        .await
        .expect("json");
    assert_eq!(health.status, "ok");
    assert_eq!(health.backend, "description");
}

#[tokio::test]
async fn requested_count_clamped_to_max_results() {
    let mock = MockServer::start().await;
    let pages: Vec<(String, ResponseTemplate)> = (0..4)
        .map(|i| (format!("p{i}"), page(&format!("P{i}"), &format!("<p>body {i}</p>"))))
        .collect();
    let refs: Vec<(&str, ResponseTemplate)> = pages.iter().map(|(n, t)| (n.as_str(), t.clone())).collect();
    mount_site(&mock, &refs).await;

    let mut config = config_for(&mock, BackendKind::Scrape);
    config.server.max_results = 2;
    let server = SearchServer::start(&config).await.expect("start");
    let client = SearchClient::new(server.url()).expect("client");
    let response = client.search("many", 50).await.expect("search");

    assert_eq!(response.len(), 2);
}
