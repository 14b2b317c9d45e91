//! HTML pages
//!
//! Small inline documents. Every user-supplied value goes through
//! `html_escape` before it is interpolated.

use axum::http::StatusCode;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::auth::AuthenticatedUser;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{} - Wits</title>
  <link rel="icon" href="/favicon.ico" />
  <script src="https://unpkg.com/htmx.org@1.9.12"></script>
</head>
<body hx-boost="true">
{}
</body>
</html>"#,
        text(title),
        body
    )
}

fn error_banner(error: Option<&str>) -> String {
    error
        .map(|message| format!(r#"  <p class="error" role="alert">{}</p>"#, text(message)))
        .unwrap_or_default()
}

fn nav(user: &AuthenticatedUser) -> String {
    if user.logged_in {
        format!(
            r#"  <nav>
    <a href="/dashboard">Dashboard</a>
    <a href="/settings">Settings</a>
    <span>{}</span>
    <form method="post" action="/logout" hx-post="/logout"><button type="submit">Log out</button></form>
  </nav>"#,
            text(user.display_name())
        )
    } else {
        r#"  <nav>
    <a href="/login">Log in</a>
    <a href="/register">Register</a>
  </nav>"#
            .to_string()
    }
}

/// Error page for requests that cannot continue
pub fn error_page(status: StatusCode, message: &str) -> String {
    let title = status.canonical_reason().unwrap_or("Error");
    layout(
        title,
        &format!(
            r#"  <h1>{} {}</h1>
  <p>{}</p>
  <p><a href="/">Back to the start page</a></p>"#,
            status.as_u16(),
            text(title),
            text(message)
        ),
    )
}

/// Login form, optionally re-rendered with the submitted email and an error
pub fn login_form(email: &str, to: &str, error: Option<&str>, show_providers: bool) -> String {
    let providers = if show_providers {
        r#"  <p><a href="/login/provider/google">Log in with Google</a></p>"#
    } else {
        ""
    };

    layout(
        "Log in",
        &format!(
            r#"  <h1>Log in</h1>
{}
  <form method="post" action="/login">
    <input type="hidden" name="to" value="{}" />
    <label>Email <input type="email" name="email" value="{}" required /></label>
    <label>Password <input type="password" name="password" required /></label>
    <button type="submit">Log in</button>
  </form>
{}
  <p>No account yet? <a href="/register">Register</a></p>"#,
            error_banner(error),
            attr(to),
            attr(email),
            providers
        ),
    )
}

/// Registration form, optionally re-rendered with the submitted email and an error
pub fn register_form(email: &str, error: Option<&str>) -> String {
    layout(
        "Register",
        &format!(
            r#"  <h1>Register</h1>
{}
  <form method="post" action="/register">
    <label>Email <input type="email" name="email" value="{}" required /></label>
    <label>Password <input type="password" name="password" required /></label>
    <label>Confirm password <input type="password" name="password-confirmation" required /></label>
    <button type="submit">Register</button>
  </form>
  <p>Already registered? <a href="/login">Log in</a></p>"#,
            error_banner(error),
            attr(email)
        ),
    )
}

/// Shown after a registration that waits for email confirmation
pub fn register_success(email: &str) -> String {
    layout(
        "Check your email",
        &format!(
            r#"  <h1>Check your email</h1>
  <p>We sent a confirmation link to <strong>{}</strong>. Follow it to finish signing up.</p>"#,
            text(email)
        ),
    )
}

/// Callback page for providers that return the token in the URL fragment
///
/// The fragment never reaches the server, so the page moves it into the
/// query string and loads the callback again.
pub fn auth_callback_script() -> String {
    layout(
        "Signing in",
        r#"  <p>Signing you in...</p>
  <script>
    (function () {
      var params = new URLSearchParams(window.location.hash.substring(1));
      var token = params.get("access_token");
      if (token) {
        window.location.replace("/auth/callback?access_token=" + encodeURIComponent(token));
      } else {
        window.location.replace("/login");
      }
    })();
  </script>"#,
    )
}

pub fn home(user: &AuthenticatedUser) -> String {
    let greeting = if user.logged_in {
        format!("<p>Welcome back, {}.</p>", text(user.display_name()))
    } else {
        "<p>Log in or register to continue.</p>".to_string()
    };

    layout(
        "Home",
        &format!("{}\n  <h1>Wits</h1>\n  {}", nav(user), greeting),
    )
}

pub fn dashboard(user: &AuthenticatedUser) -> String {
    layout(
        "Dashboard",
        &format!(
            "{}\n  <h1>Dashboard</h1>\n  <p>Signed in as {}.</p>",
            nav(user),
            text(&user.email)
        ),
    )
}

pub fn settings(user: &AuthenticatedUser) -> String {
    let username = user
        .account
        .as_ref()
        .map(|account| account.username.as_str())
        .unwrap_or("");

    layout(
        "Settings",
        &format!(
            r#"{}
  <h1>Settings</h1>
  <dl>
    <dt>Email</dt><dd>{}</dd>
    <dt>Username</dt><dd>{}</dd>
  </dl>"#,
            nav(user),
            text(&user.email),
            text(username)
        ),
    )
}
