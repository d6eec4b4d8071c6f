use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, recipes};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(recipes::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "5555".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn signed_up(app: &Router) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/signup",
            None,
            Some(json!({ "username": "chef1", "password": "pw123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn signup_returns_created_user_without_hash() {
        let app = build_app(AppState::fake());
        let (status, body) = call(
            &app,
            Method::POST,
            "/signup",
            None,
            Some(json!({ "username": "chef1", "password": "pw123", "bio": "Soups." })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(body["user"]["id"].is_string());
        assert_eq!(body["user"]["username"], "chef1");
        assert_eq!(body["user"]["bio"], "Soups.");
        assert!(!body.to_string().contains("password"));
        assert!(!body.to_string().contains("argon2"));
    }

    #[tokio::test]
    async fn duplicate_signup_is_unprocessable() {
        let app = build_app(AppState::fake());
        signed_up(&app).await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/signup",
            None,
            Some(json!({ "username": "chef1", "password": "other" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({ "errors": ["Username must be unique."] }));
    }

    #[tokio::test]
    async fn wrong_password_establishes_no_session() {
        let app = build_app(AppState::fake());
        signed_up(&app).await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "chef1", "password": "wrongpw" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("access_token").is_none());
    }

    #[tokio::test]
    async fn login_check_session_and_logout() {
        let app = build_app(AppState::fake());
        signed_up(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "chef1", "password": "pw123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["access_token"].as_str().unwrap().to_string();

        let (status, body) = call(&app, Method::GET, "/check_session", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "chef1");

        let (status, _) = call(&app, Method::DELETE, "/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // The session row is gone, so the same token no longer works.
        let (status, _) = call(&app, Method::GET, "/check_session", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(&app, Method::DELETE, "/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn recipes_require_a_session() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/recipes", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Unauthorized" }));

        let (status, _) = call(&app, Method::GET, "/recipes", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_and_list_recipes() {
        let app = build_app(AppState::fake());
        let token = signed_up(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/recipes",
            Some(&token),
            Some(json!({
                "title": "Hasty Party Ham",
                "instructions": "As am hastily invited settled at limited civilly fortune me. Really spring in extent.",
                "minutes_to_complete": 30
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["title"], "Hasty Party Ham");
        assert_eq!(body["minutes_to_complete"], 30);

        let (status, body) = call(&app, Method::GET, "/recipes", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn invalid_recipe_lists_every_error() {
        let app = build_app(AppState::fake());
        let token = signed_up(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/recipes",
            Some(&token),
            Some(json!({ "title": "  ", "instructions": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({ "errors": [
                "Title is required.",
                "Instructions must be at least 50 characters long.",
                "Minutes to complete is required."
            ]})
        );
    }

    #[tokio::test]
    async fn mistyped_body_fields_get_json_errors() {
        let app = build_app(AppState::fake());
        let token = signed_up(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/recipes",
            Some(&token),
            Some(json!({
                "title": "Soup",
                "instructions": "x".repeat(60),
                "minutes_to_complete": "thirty"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let errors = body["errors"].as_array().expect("errors list");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].as_str().unwrap().contains("minutes_to_complete"));

        let (status, body) = call(
            &app,
            Method::POST,
            "/signup",
            None,
            Some(json!({ "username": 42, "password": "pw123" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"][0].as_str().unwrap().contains("username"));
    }

    #[tokio::test]
    async fn unparseable_body_is_a_json_400() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"username\": "))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["errors"][0].is_string());
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
