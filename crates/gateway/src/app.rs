//! Shared state and router assembly

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use commentarium_common::{
    config::AppConfig, db::SiteStore, embeddings::Embedder, llm::Generator,
    proxy::ResourceProxy,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::{
    admin::require_admin,
    metrics::track_metrics,
    rate_limit::{create_rate_limiter, rate_limit_middleware, GlobalRateLimiter},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SiteStore>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pub proxy: Arc<ResourceProxy>,
    pub limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn SiteStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        proxy: Arc<ResourceProxy>,
    ) -> Self {
        let limiter = config.rate_limit.enabled.then(|| {
            create_rate_limiter(config.rate_limit.requests_per_second, config.rate_limit.burst)
        });

        Self {
            config,
            store,
            embedder,
            generator,
            proxy,
            limiter,
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // LLM and embedding calls cost money, so these share one token bucket
    let paid_functions = Router::new()
        .route("/generate-content", post(handlers::generate::generate_content))
        .route("/generate-image", post(handlers::generate::generate_image))
        .route("/store-embedding", post(handlers::knowledge::store_embedding))
        .route_layer(from_fn_with_state(state.clone(), rate_limit_middleware));

    let functions = Router::new()
        .merge(paid_functions)
        .route("/proxy-resource", get(handlers::proxy::proxy_resource));

    let admin = Router::new()
        .route("/posts", get(handlers::admin_posts::list_posts).post(handlers::admin_posts::create_post))
        .route("/posts/{id}", put(handlers::admin_posts::update_post).delete(handlers::admin_posts::delete_post))
        .route("/documents", get(handlers::documents::list_documents).post(handlers::documents::create_document))
        .route("/documents/{id}", delete(handlers::documents::delete_document))
        .route("/knowledge/search", post(handlers::knowledge::search_knowledge))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let api = Router::new()
        .route("/posts", get(handlers::posts::list_posts))
        .route("/posts/{slug}", get(handlers::posts::get_post))
        .route("/newsletter", post(handlers::newsletter::subscribe))
        .nest("/admin", admin);

    Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api)
        .nest("/functions", functions)
        .layer(DefaultBodyLimit::max(state.config.server.body_limit_bytes))
        .layer(from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Router wiring over in-memory collaborators

    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use commentarium_common::{
        auth::hash_api_key, config::ProxyConfig, db::MemoryStore, embeddings::MockEmbedder,
        llm::MockGenerator,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    pub const ADMIN_KEY: &str = "chiave-di-prova";

    pub struct TestApp {
        pub store: Arc<MemoryStore>,
        pub router: Router,
    }

    pub struct TestAppBuilder {
        config: AppConfig,
        generator: Arc<dyn Generator>,
    }

    impl TestAppBuilder {
        pub fn new() -> Self {
            let mut config = AppConfig::default();
            config.auth.admin_key_hash = Some(hash_api_key(ADMIN_KEY));
            config.embedding.dimension = 16;
            config.rate_limit.enabled = false;
            Self {
                config,
                generator: Arc::new(MockGenerator::new("Titolo generato")),
            }
        }

        pub fn generator(mut self, generator: MockGenerator) -> Self {
            self.generator = Arc::new(generator);
            self
        }

        pub fn proxy_upstream(mut self, base: &str) -> Self {
            self.config.proxy = ProxyConfig {
                upstream_base: base.to_string(),
                ..ProxyConfig::default()
            };
            self
        }

        pub fn rate_limit(mut self, requests_per_second: u32, burst: u32) -> Self {
            self.config.rate_limit.enabled = true;
            self.config.rate_limit.requests_per_second = requests_per_second;
            self.config.rate_limit.burst = burst;
            self
        }

        pub fn build(self) -> TestApp {
            let store = Arc::new(MemoryStore::new());
            let proxy = Arc::new(ResourceProxy::new(&self.config.proxy).unwrap());
            let embedder = Arc::new(MockEmbedder::new(self.config.embedding.dimension));
            let state = AppState::new(
                Arc::new(self.config),
                store.clone(),
                embedder,
                self.generator,
                proxy,
            );
            TestApp {
                store,
                router: create_router(state),
            }
        }
    }

    impl TestApp {
        pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, json)
        }
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn admin(mut request: Request<Body>) -> Request<Body> {
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {ADMIN_KEY}").parse().unwrap(),
        );
        request
    }
}
