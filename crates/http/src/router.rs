//! Router builder for the bookstore HTTP server

use std::path::{Path, PathBuf};

use axum::{
    extract::OriginalUri,
    handler::HandlerWithoutStateExt,
    http::{Method, Uri},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use bookstore_kernel::ModuleRegistry;

use crate::error::AppError;
use crate::MakeRequestUuidV7;

type LayerFn = Box<dyn FnOnce(Router) -> Router + Send>;

/// Builder for constructing the main HTTP router.
///
/// Middleware registered with the `with_*` methods is applied in `build`,
/// after every route and the fallback exist, so it wraps all of them. Later
/// calls wrap earlier ones.
pub struct RouterBuilder {
    router: Router,
    api: Router,
    static_dir: Option<PathBuf>,
    layers: Vec<LayerFn>,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            api: Router::new(),
            static_dir: None,
            layers: Vec::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Merge a module's router into the `/api` tree
    pub fn mount_module(mut self, module_router: Router) -> Self {
        self.api = self.api.merge(module_router);
        self
    }

    /// Serve files from `dir` for any request no route claims
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.layers.push(Box::new(|router: Router| {
            router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            )
        }));
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.layers.push(Box::new(|router: Router| {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        }));
        self
    }

    /// Add request ID middleware; the id is echoed on the response
    pub fn with_request_id(mut self) -> Self {
        self.layers.push(Box::new(|router: Router| {
            router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        }));
        self
    }

    /// Add OpenAPI documentation by collecting specs from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = merged_openapi(registry);

        // Deserialize our JSON spec into a proper utoipa OpenApi object
        // so SwaggerUI can serve it
        let openapi_obj: utoipa::openapi::OpenApi =
            match serde_json::from_value(openapi_spec.clone()) {
                Ok(spec) => spec,
                Err(error) => {
                    tracing::warn!(%error, "merged OpenAPI document rejected; serving a bare one");
                    utoipa::openapi::OpenApiBuilder::new()
                        .info(
                            utoipa::openapi::InfoBuilder::new()
                                .title("Bookstore API")
                                .version("1.0.0")
                                .build(),
                        )
                        .build()
                }
            };

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        // Also serve the raw JSON spec at /docs/openapi.json for external consumers
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        // A known path hit with the wrong method is answered like an unknown
        // path instead of axum's empty 405.
        let api = self.api.method_not_allowed_fallback(method_not_allowed);
        let mut router = self
            .router
            .method_not_allowed_fallback(method_not_allowed)
            .nest("/api", api);

        router = match self.static_dir {
            Some(dir) => router.fallback_service(
                ServeDir::new(&dir)
                    .call_fallback_on_method_not_allowed(true)
                    .not_found_service(not_found_handler(&dir).into_service()),
            ),
            None => router.fallback(|method: Method, uri: Uri| async move {
                AppError::route_not_found(&method, &uri, "no static directory is configured")
            }),
        };

        self.layers
            .into_iter()
            .fold(router, |router, layer| layer(router))
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::route_not_found(&method, &uri, "the path exists but does not accept this method")
}

fn not_found_handler(
    dir: &Path,
) -> impl Fn(Method, Uri) -> std::future::Ready<AppError> + Clone + Send + Sync + 'static {
    let detail = format!("no route or static file under '{}' matches", dir.display());
    move |method: Method, uri: Uri| {
        std::future::ready(AppError::route_not_found(&method, &uri, detail.clone()))
    }
}

fn merged_openapi(registry: &ModuleRegistry) -> serde_json::Value {
    let mut openapi_spec = serde_json::json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Bookstore API",
            "version": "1.0.0",
            "description": "Book inventory and purchase API"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "message": { "type": "string" },
            "code": { "type": "string" },
            "detail": { "type": "string" }
        },
        "required": ["success", "message", "code"]
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {
                        "text/plain": {
                            "schema": {
                                "type": "string"
                            }
                        }
                    }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };

        if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                openapi_spec["paths"][format!("/api{}", path)] = path_item.clone();
            }
        }

        if let Some(schemas) = module_spec
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }
    }

    openapi_spec
}
