use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, recipes};

pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    let session_layer = auth::session::layer(&state.config.session)?;

    Ok(Router::new()
        .merge(auth::router())
        .merge(recipes::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(session_layer)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
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
        ))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Drives the real router against in-memory stores, carrying the session
/// cookie between requests the way a browser would.
#[cfg(test)]
pub(crate) mod test_client {
    use axum::{
        body::Body,
        http::{header, Request, Response},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::state::AppState;

    pub fn app() -> Router {
        super::build_app(AppState::fake()).expect("test app builds")
    }

    pub struct TestResponse {
        pub status: u16,
        pub cookie: Option<String>,
        pub body: Value,
    }

    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request builds"),
            None => builder.body(Body::empty()).expect("request builds"),
        };
        let response = app.clone().oneshot(request).await.expect("handler runs");
        into_test_response(response).await
    }

    pub async fn signup(app: &Router, username: &str, password: &str) -> TestResponse {
        send(
            app,
            "POST",
            "/signup",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    async fn into_test_response(response: Response<Body>) -> TestResponse {
        let status = response.status().as_u16();
        // Only the `name=value` pair goes back out in the Cookie header.
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.to_string());
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            cookie,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_client::{app, send};

    #[tokio::test]
    async fn health_answers_without_auth() {
        let app = app();
        let res = send(&app, "GET", "/health", None, None).await;
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = app();
        let res = send(&app, "GET", "/nope", None, None).await;
        assert_eq!(res.status, 404);
    }
}
