//! E2E tests for health check, metrics and static files

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::local().await;

    let response = server.get("/health", None).await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_home_page_is_public() {
    let server = TestServer::local().await;

    let response = server.get("/", None).await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains(r#"href="/login""#));
}

#[tokio::test]
async fn test_static_files_are_served() {
    let server = TestServer::local().await;

    let css = server.get("/public/app.css", None).await;
    assert_eq!(css.status(), 200);
    assert_eq!(css.text().await.unwrap(), "body { margin: 0; }");

    let favicon = server.get("/favicon.ico", None).await;
    assert_eq!(favicon.status(), 200);
}

#[tokio::test]
async fn test_metrics_count_auth_attempts() {
    let server = TestServer::local().await;
    server
        .post_form(
            "/login",
            &[("email", "nobody@example.com"), ("password", "x")],
            None,
        )
        .await;

    let response = server.get("/metrics", None).await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("wits_auth_attempts_total"));
    assert!(body.contains(r#"outcome="rejected""#));
}

#[tokio::test]
async fn test_404_for_unknown_routes() {
    let server = TestServer::local().await;

    let response = server.get("/unknown/route", None).await;

    assert_eq!(response.status(), 404);
}
