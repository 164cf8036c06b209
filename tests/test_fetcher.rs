use mealprint::config::FetchConfig;
use mealprint::{FetchError, Fetcher, HttpFetcher};
use reqwest::StatusCode;
use std::time::Duration;

#[tokio::test]
async fn test_fetch_returns_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/recipe")
        .match_header("user-agent", "Mozilla/5.0 (compatible; Mealprint/1.0)")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><h1>Hi</h1></html>")
        .create_async()
        .await;

    let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
    let body = fetcher
        .fetch(&format!("{}/recipe", server.url()))
        .await
        .unwrap();

    assert_eq!(body, "<html><h1>Hi</h1></html>");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_custom_user_agent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_header("user-agent", "grocery-bot/2")
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let config = FetchConfig {
        user_agent: "grocery-bot/2".to_string(),
        ..FetchConfig::default()
    };
    let fetcher = HttpFetcher::new(&config).unwrap();
    fetcher.fetch(&format!("{}/", server.url())).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status() {
    let mut server = mockito::Server::new_async().await;
    let _missing = server
        .mock("GET", "/missing")
        .with_status(404)
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/broken")
        .with_status(503)
        .create_async()
        .await;

    let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();

    let err = fetcher
        .fetch(&format!("{}/missing", server.url()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status(StatusCode::NOT_FOUND)));
    assert!(!err.is_retryable());

    let err = fetcher
        .fetch(&format!("{}/broken", server.url()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status(StatusCode::SERVICE_UNAVAILABLE)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_invalid_urls() {
    let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();

    let err = fetcher.fetch("not a url").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl(_)));

    let err = fetcher.fetch("ftp://example.com/recipe").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl(_)));
    assert!(err.to_string().contains("unsupported scheme 'ftp'"));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    // Accepts connections into the backlog but never answers
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/slow", listener.local_addr().unwrap());

    let fetcher = HttpFetcher::with_timeout(Duration::from_millis(300)).unwrap();
    let err = fetcher.fetch(&url).await.unwrap_err();

    assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_millis(300)));
    assert!(err.is_retryable());
    drop(listener);
}

#[tokio::test]
async fn test_fetch_bytes() {
    let mut server = mockito::Server::new_async().await;
    let png_header: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let _m = server
        .mock("GET", "/photo.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(png_header)
        .create_async()
        .await;

    let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
    let bytes = fetcher
        .fetch_bytes(&format!("{}/photo.png", server.url()))
        .await
        .unwrap();
    assert_eq!(bytes, png_header);
}
