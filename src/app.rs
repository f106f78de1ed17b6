use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{HeaderValue, Request},
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::tasks::TaskStats;
use crate::{auth, posts};

/// `x-request-id` generator: a uuid v4 in simple form, cut to `len` chars.
#[derive(Clone, Copy)]
struct CorrelationId {
    len: usize,
}

impl MakeRequestId for CorrelationId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(self.len);
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

pub fn build_app(state: AppState) -> Router {
    let correlation = CorrelationId {
        len: state.config.correlation_id_len(),
    };

    Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .route("/health", get(|| async { "ok" }))
        .route("/tasks/stats", get(task_stats))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    let request_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-")
                        .to_string();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        %request_id,
                        status = tracing::field::Empty
                    )
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
        .layer(SetRequestIdLayer::x_request_id(correlation))
}

async fn task_stats(State(state): State<AppState>) -> Json<TaskStats> {
    Json(state.tasks.stats())
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
