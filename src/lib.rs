use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue},
    middleware,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod schedule;
pub mod token;

// Routing split by access level (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use password::PasswordHasher;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use schedule::ScheduleResolver;
pub use token::TokenService;

use models::Role;
use password::HashError;

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login,
        handlers::list_routes, handlers::get_route, handlers::create_route,
        handlers::update_route, handlers::delete_route,
        handlers::list_vehicles, handlers::get_vehicle, handlers::create_vehicle,
        handlers::update_vehicle, handlers::delete_vehicle,
        handlers::list_schedules, handlers::get_schedule, handlers::create_schedule,
        handlers::update_schedule, handlers::delete_schedule
    ),
    components(
        schemas(
            models::Role, models::Route, models::Vehicle, models::Schedule,
            models::ScheduleWithRoute, models::RegisterRequest, models::LoginRequest,
            models::LoginResponse, models::MessageResponse, models::CreateRouteRequest,
            models::UpdateRouteRequest, models::CreateVehicleRequest,
            models::UpdateVehicleRequest, models::CreateScheduleRequest,
            models::UpdateScheduleRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "transit-scheduler", description = "Transport Scheduling API")
    )
)]
struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// The single shared container handed to every request. All members are
/// cheap to clone (`Arc`s inside), and nothing in here is mutated after
/// startup; the store handle is injected here rather than living in a global.
#[derive(Clone)]
pub struct AppState {
    /// Entity Store: Postgres in production, in-memory for tests and demos.
    pub repo: RepositoryState,
    /// Loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Issues and verifies session tokens.
    pub tokens: TokenService,
    /// bcrypt hashing, run off the async workers.
    pub hasher: PasswordHasher,
}

impl AppState {
    /// Builds the token service and password hasher from `config`.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Result<Self, HashError> {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_hours);
        let hasher = PasswordHasher::new(config.bcrypt_cost)?;
        Ok(Self {
            repo,
            config,
            tokens,
            hasher,
        })
    }

    pub fn schedules(&self) -> ScheduleResolver {
        ScheduleResolver::new(self.repo.clone())
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = match config.cors_origin.as_deref() {
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!(origin, "CORS_ORIGIN is not a valid header value, allowing any origin");
                AllowOrigin::any()
            }
        },
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(origin)
        .allow_headers(Any)
}

/// create_router
///
/// Assembles the routing tree. The three routers share paths (`GET` is
/// authenticated, `POST`/`PUT`/`DELETE` on the same path are admin-only), so
/// each one carries its own guards as `route_layer`s before being merged.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public: health, register, login.
        .merge(public::public_routes())
        // Authenticated: any valid session.
        .merge(authenticated::authenticated_routes().route_layer(
            middleware::from_fn_with_state(state.clone(), auth::require_authenticated),
        ))
        // Admin: role check runs inside the authentication layer.
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(
                    Role::Admin,
                    auth::require_role,
                ))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth::require_authenticated,
                )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span for one request, tagged with method, uri and
/// the `x-request-id` set by `SetRequestIdLayer`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
