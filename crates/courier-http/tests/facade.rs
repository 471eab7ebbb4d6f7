//! Facade behaviour against wiremock stub servers

use courier_http::{
    run_concurrent, simple_delete, simple_get, simple_patch, simple_post, simple_put, HttpError,
    HttpMethod, LoadPlan, Outcome, RequestFacade, NO_FIELDS,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

/// Responds with the request path followed by a newline
struct PathEcho;

impl Respond for PathEcho {
    fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_string(format!("{}\n", request.url.path()))
    }
}

async fn server_with_body(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_drain_concatenates_lines_without_separator() {
    let server = server_with_body("a\nb\nc\n").await;
    let facade = RequestFacade::complete();
    let client = facade.acquire_client().unwrap();

    let request = facade.get(&server.uri()).unwrap();
    let response = client.execute(&request).await.unwrap();
    assert_eq!(response.status_code(), 200);
    let text = facade.drain_to_string(response, &request).await.unwrap();

    assert_eq!(text, "abc");
    assert!(!request.is_aborted());
    facade.release();
}

#[tokio::test]
async fn test_drain_strips_crlf_and_handles_empty_body() {
    let server = server_with_body("first\r\nsecond").await;
    let facade = RequestFacade::complete();

    let request = facade.get(&server.uri()).unwrap();
    let response = facade.execute(&request).await.unwrap();
    assert_eq!(
        facade.drain_to_string(response, &request).await.unwrap(),
        "firstsecond"
    );

    let empty = server_with_body("").await;
    let request = facade.get(&empty.uri()).unwrap();
    let response = facade.execute(&request).await.unwrap();
    assert_eq!(facade.drain_to_string(response, &request).await.unwrap(), "");
}

#[tokio::test]
async fn test_post_sends_ordered_form_in_latin1() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/form"))
        .and(header(
            "content-type",
            "application/x-www-form-urlencoded; charset=ISO-8859-1",
        ))
        .and(body_string("name=Jos%E9&b=2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("accepted\n"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/form", server.uri());
    let body = simple_post(&url, &[("name", "Jos\u{e9}"), ("b", "2")])
        .await
        .unwrap();
    assert_eq!(body, "accepted");
}

#[tokio::test]
async fn test_put_and_patch_send_empty_body() {
    let server = MockServer::start().await;
    for verb in ["PUT", "PATCH"] {
        Mock::given(method(verb))
            .and(body_string(""))
            .respond_with(ResponseTemplate::new(200).set_body_string(verb))
            .expect(1)
            .mount(&server)
            .await;
    }

    assert_eq!(simple_put(&server.uri(), NO_FIELDS).await.unwrap(), "PUT");
    assert_eq!(simple_patch(&server.uri(), NO_FIELDS).await.unwrap(), "PATCH");
}

#[tokio::test]
async fn test_simple_get_and_delete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("got\nit\n"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    assert_eq!(simple_get(&server.uri()).await.unwrap(), "gotit");
    assert_eq!(simple_delete(&server.uri()).await.unwrap(), "");
}

#[tokio::test]
async fn test_non_success_status_is_still_drained() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing\n"))
        .mount(&server)
        .await;

    let facade = RequestFacade::complete();
    let request = facade.get(&server.uri()).unwrap();
    let response = facade.execute(&request).await.unwrap();
    assert!(response.is_client_error());
    assert_eq!(
        facade.drain_to_string(response, &request).await.unwrap(),
        "missing"
    );
}

#[tokio::test]
async fn test_execute_aborted_request_errors() {
    let server = server_with_body("never read").await;
    let facade = RequestFacade::complete();
    let request = facade.get(&server.uri()).unwrap();
    request.abort();

    let err = facade.execute(&request).await.unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, HttpError::Aborted(_)));
}

#[tokio::test]
async fn test_abort_interrupts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let facade = RequestFacade::complete();
    let request = facade.get(&server.uri()).unwrap();
    let handle = request.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), facade.execute(&request))
        .await
        .expect("aborted request must not hang");
    assert!(matches!(result, Err(HttpError::Aborted(_))));
}

#[tokio::test]
async fn test_request_executes_only_once() {
    let server = server_with_body("once").await;
    let facade = RequestFacade::complete();
    let request = facade.get(&server.uri()).unwrap();

    let response = facade.execute(&request).await.unwrap();
    facade.drain_to_string(response, &request).await.unwrap();

    let err = facade.execute(&request).await.unwrap_err();
    assert!(matches!(err, HttpError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_released_pool_rejects_existing_handles() {
    let server = server_with_body("pooled").await;
    let facade = RequestFacade::complete();
    let client = facade.acquire_client().unwrap();

    facade.release();
    facade.release();

    let request = facade.get(&server.uri()).unwrap();
    let err = client.execute(&request).await.unwrap_err();
    assert!(matches!(err, HttpError::PoolShutdown));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_invalid_text_aborts_originating_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'o', b'k', b'\n', 0xff, 0xfe, b'\n']))
        .mount(&server)
        .await;

    let facade = RequestFacade::complete();
    let request = facade.get(&server.uri()).unwrap();
    let response = facade.execute(&request).await.unwrap();
    let err = facade.drain_to_string(response, &request).await.unwrap_err();

    assert!(matches!(err, HttpError::Unexpected(_)));
    assert!(request.is_aborted());
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let err = simple_get("http://127.0.0.1:1/").await.unwrap_err();
    assert!(matches!(err, HttpError::Transport(_)));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_https_only_facade_rejects_http() {
    let facade = RequestFacade::https();
    let request = facade.get("http://127.0.0.1:1/").unwrap();
    let err = facade.execute(&request).await.unwrap_err();
    assert!(matches!(err, HttpError::UnsupportedScheme(ref s) if s == "http"));
}

#[tokio::test]
async fn test_concurrent_requests_get_their_own_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(PathEcho)
        .mount(&server)
        .await;

    let facade = RequestFacade::complete();
    let plan = LoadPlan::new(HttpMethod::Get, format!("{}/item/{{i}}", server.uri()))
        .requests(128)
        .concurrency(128);

    let report = run_concurrent(&facade, &plan, &CancellationToken::new())
        .await
        .unwrap();
    facade.release();

    assert_eq!(report.succeeded(), 128);
    assert_eq!(report.panicked, 0);
    for (expected, outcome) in report.outcomes.iter().enumerate() {
        assert_eq!(outcome.index, expected);
        assert_eq!(
            outcome.outcome.body(),
            Some(format!("/item/{}", expected).as_str())
        );
    }
}

#[tokio::test]
async fn test_cancel_aborts_in_flight_workers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let facade = RequestFacade::complete();
    let plan = LoadPlan::new(HttpMethod::Get, server.uri())
        .requests(16)
        .concurrency(4);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        run_concurrent(&facade, &plan, &cancel),
    )
    .await
    .expect("cancelled run must join promptly")
    .unwrap();

    assert_eq!(report.outcomes.len(), 16);
    assert_eq!(report.cancelled(), 16);
    assert!(report
        .outcomes
        .iter()
        .all(|o| matches!(o.outcome, Outcome::Cancelled)));
}
