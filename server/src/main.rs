mod api;
mod auth;
mod catalog;
mod db;
mod images;
mod models;
mod raw_sql;
mod schema;
mod telemetry;

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::Router;
use std::env;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across all handlers
pub type AppState = Arc<db::DbPool>;

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).cloned()
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    // Check for --openapi flag to dump spec and exit
    if args.iter().any(|arg| arg == "--openapi") {
        let spec = api::openapi().to_pretty_json().unwrap();
        println!("{}", spec);
        return;
    }

    telemetry::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool: AppState = Arc::new(db::create_pool(&database_url));

    // Catalog loaders run against the migrated database, then exit
    if let Some(path) = flag_value(&args, "--load-ingredients") {
        catalog::load_ingredients(&pool, &path);
        return;
    }
    if let Some(path) = flag_value(&args, "--load-tags") {
        catalog::load_tags(&pool, &path);
        return;
    }

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    let app = Router::new()
        .nest("/api/auth/token", api::token::router())
        .nest("/api/users", api::users::router())
        .nest("/api/tags", api::tags::router())
        .nest("/api/ingredients", api::ingredients::router())
        .nest("/api/recipes", api::recipes::router())
        .merge(swagger_ui)
        .with_state(pool)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %matched_path,
                    )
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &Span| {
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        );

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());
    tracing::info!("Swagger UI available at /swagger-ui/");
    tracing::info!("OpenAPI spec available at /api-docs/openapi.json");

    axum::serve(listener, app).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value_present() {
        let args: Vec<String> = ["bin", "--load-tags", "data/tags.json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            flag_value(&args, "--load-tags"),
            Some("data/tags.json".to_string())
        );
    }

    #[test]
    fn test_flag_value_missing() {
        let args: Vec<String> = vec!["bin".to_string()];
        assert_eq!(flag_value(&args, "--load-tags"), None);
    }

    #[test]
    fn test_flag_value_without_operand() {
        let args: Vec<String> = ["bin", "--load-tags"].iter().map(|s| s.to_string()).collect();
        assert_eq!(flag_value(&args, "--load-tags"), None);
    }

    #[test]
    fn test_openapi_spec_builds() {
        let spec = api::openapi();
        assert!(spec.paths.paths.contains_key("/api/recipes"));
        assert!(spec
            .paths
            .paths
            .contains_key("/api/recipes/download_shopping_cart"));
        assert!(spec.paths.paths.contains_key("/api/users/{id}/subscribe"));
        assert!(spec.paths.paths.contains_key("/api/auth/token/login"));
    }
}
