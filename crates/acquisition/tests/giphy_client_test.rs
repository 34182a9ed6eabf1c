use gifguess_acquisition::{AcquisitionError, GiphyClient, SearchProvider};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GiphyClient {
    GiphyClient::new("test-key".to_string(), 50, Duration::from_secs(2))
        .unwrap()
        .with_base_url(format!("{}/v1/gifs", server.uri()))
}

/// Search request carries paging and rating parameters
#[tokio::test]
async fn test_search_page_request_and_parse() {
    let mock_server = MockServer::start().await;

    let response_body = serde_json::json!({
        "data": [{
            "id": "xT9IgG50Fb7Mi0prBC",
            "title": "Coffee GIF",
            "alt_text": "cat with coffee",
            "url": "https://giphy.com/gifs/xT9IgG50Fb7Mi0prBC",
            "import_datetime": "2016-05-26 18:30:52",
            "images": {
                "original": { "url": "https://media.giphy.com/media/xT9IgG50Fb7Mi0prBC/giphy.gif", "width": "480", "height": "270", "size": "2210000" },
                "fixed_width": { "url": "https://media.giphy.com/media/xT9IgG50Fb7Mi0prBC/200w.gif", "width": "200", "height": "113" }
            }
        }],
        "pagination": { "total_count": 1, "count": 1, "offset": 50 },
        "meta": { "status": 200, "msg": "OK" }
    });

    Mock::given(method("GET"))
        .and(path("/v1/gifs/search"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("q", "iced coffee"))
        .and(query_param("limit", "50"))
        .and(query_param("offset", "50"))
        .and(query_param("rating", "pg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = assert_ok!(client(&mock_server).search_page("iced coffee", 50, 50, "pg").await);

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.pagination.total_count, 1);
    let item = gifguess_acquisition::normalize(&page.data[0], "iced coffee");
    assert_eq!(item.compact().unwrap().width, 200);
    assert_eq!(item.full().unwrap().size_bytes, 2_210_000);
}

/// Non-2xx responses become provider errors
#[tokio::test]
async fn test_rate_limited_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/gifs/search"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
        .mount(&mock_server)
        .await;

    let err = assert_err!(client(&mock_server).search_page("cats", 50, 0, "pg").await);
    match err {
        AcquisitionError::Provider { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "Too many requests");
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Bodies that are not JSON are reported as malformed
#[tokio::test]
async fn test_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/gifs/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).search_page("cats", 50, 0, "pg").await;
    assert!(matches!(result, Err(AcquisitionError::MalformedResponse(_))));
}

/// Requests past the client timeout fail rather than hang
#[tokio::test]
async fn test_request_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/gifs/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "data": [] }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let client = GiphyClient::new("k".to_string(), 50, Duration::from_millis(200))
        .unwrap()
        .with_base_url(format!("{}/v1/gifs", mock_server.uri()));

    let result = client.search_page("cats", 50, 0, "pg").await;
    assert!(matches!(result, Err(AcquisitionError::Http(_))));
}
