//! E2E tests for delegated authentication against a stub identity provider

mod common;

use common::{
    STUB_ACCESS_TOKEN, STUB_BROKEN_EMAIL, STUB_EMAIL, STUB_PASSWORD, STUB_TAKEN_EMAIL, TestServer,
    location, session_cookie,
};
use wits::error::{DUPLICATE_USER_MESSAGE, INVALID_CREDENTIALS_MESSAGE, UPSTREAM_FAILURE_MESSAGE};

#[tokio::test]
async fn test_login_page_offers_provider_login() {
    let server = TestServer::remote().await;

    let response = server.get("/login", None).await;

    assert_eq!(response.status(), 200);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("/login/provider/google"));
}

#[tokio::test]
async fn test_remote_login_opens_session() {
    let server = TestServer::remote().await;

    let cookie = server.login(STUB_EMAIL, STUB_PASSWORD).await;

    let dashboard = server.get("/dashboard", Some(&cookie)).await;
    assert_eq!(dashboard.status(), 200);
    assert!(dashboard.text().await.unwrap().contains(STUB_EMAIL));
}

#[tokio::test]
async fn test_remote_login_rejection_uses_generic_message() {
    let server = TestServer::remote().await;

    let response = server
        .post_form(
            "/login",
            &[("email", STUB_EMAIL), ("password", "wrong")],
            None,
        )
        .await;

    assert_eq!(response.status(), 200);
    assert!(session_cookie(&response).is_none());
    assert!(response
        .text()
        .await
        .unwrap()
        .contains(INVALID_CREDENTIALS_MESSAGE));
}

#[tokio::test]
async fn test_provider_failure_short_circuits() {
    let server = TestServer::remote().await;

    let response = server
        .post_form(
            "/login",
            &[("email", STUB_BROKEN_EMAIL), ("password", STUB_PASSWORD)],
            None,
        )
        .await;

    assert_eq!(response.status(), 502);
    assert!(session_cookie(&response).is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains(UPSTREAM_FAILURE_MESSAGE));
    assert!(body.contains(STUB_BROKEN_EMAIL));
}

#[tokio::test]
async fn test_provider_failure_is_swappable_for_htmx() {
    let server = TestServer::remote().await;

    let response = server
        .post_htmx_form(
            "/login",
            &[("email", STUB_BROKEN_EMAIL), ("password", STUB_PASSWORD)],
        )
        .await;

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("HX-Redirect").is_none());
    assert!(session_cookie(&response).is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains(UPSTREAM_FAILURE_MESSAGE));
    assert!(body.contains(STUB_BROKEN_EMAIL));
}

#[tokio::test]
async fn test_register_provider_failure_status_depends_on_htmx() {
    let server = TestServer::remote().await;
    let form = [
        ("email", STUB_BROKEN_EMAIL),
        ("password", STUB_PASSWORD),
        ("password-confirmation", STUB_PASSWORD),
    ];

    let plain = server.post_form("/register", &form, None).await;
    assert_eq!(plain.status(), 502);
    assert!(plain.text().await.unwrap().contains(UPSTREAM_FAILURE_MESSAGE));

    let boosted = server.post_htmx_form("/register", &form).await;
    assert_eq!(boosted.status(), 200);
    assert!(boosted.text().await.unwrap().contains(UPSTREAM_FAILURE_MESSAGE));
}

#[tokio::test]
async fn test_remote_register_asks_to_check_email() {
    let server = TestServer::remote().await;

    let response = server
        .post_form(
            "/register",
            &[
                ("email", "carol@example.com"),
                ("password", STUB_PASSWORD),
                ("password-confirmation", STUB_PASSWORD),
            ],
            None,
        )
        .await;

    assert_eq!(response.status(), 200);
    assert!(session_cookie(&response).is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("Check your email"));
    assert!(body.contains("carol@example.com"));
}

#[tokio::test]
async fn test_remote_register_duplicate() {
    let server = TestServer::remote().await;

    let response = server
        .post_form(
            "/register",
            &[
                ("email", STUB_TAKEN_EMAIL),
                ("password", STUB_PASSWORD),
                ("password-confirmation", STUB_PASSWORD),
            ],
            None,
        )
        .await;

    assert_eq!(response.status(), 200);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains(DUPLICATE_USER_MESSAGE));
}

#[tokio::test]
async fn test_provider_login_redirects_to_provider() {
    let server = TestServer::remote().await;

    let response = server.get("/login/provider/google", None).await;

    assert_eq!(response.status(), 303);
    let location = location(&response);
    assert!(location.contains("/auth/v1/authorize?"));
    assert!(location.contains("provider=google"));
    assert!(location.contains("redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"));
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn test_callback_without_token_serves_script() {
    let server = TestServer::remote().await;

    let response = server.get("/auth/callback", None).await;

    assert_eq!(response.status(), 200);
    assert!(session_cookie(&response).is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("window.location.hash"));
    assert!(body.contains("/auth/callback?access_token="));
}

#[tokio::test]
async fn test_callback_with_token_opens_session() {
    let server = TestServer::remote().await;

    let response = server
        .get(
            &format!("/auth/callback?access_token={STUB_ACCESS_TOKEN}"),
            None,
        )
        .await;

    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response).expect("session cookie");

    let dashboard = server.get("/dashboard", Some(&cookie)).await;
    assert_eq!(dashboard.status(), 200);
}

#[tokio::test]
async fn test_callback_with_unknown_token_is_rejected() {
    let server = TestServer::remote().await;

    let response = server
        .get("/auth/callback?access_token=forged", None)
        .await;

    assert_eq!(response.status(), 401);
    assert!(session_cookie(&response).is_none());
}
