use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Read-only catalogue access for any caller holding a valid session token.
/// `require_authenticated` wraps this router; a missing, malformed or expired
/// token is rejected with 401 before any handler runs.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Routes (rute) ---
        .route("/api/rutes", get(handlers::list_routes))
        .route("/api/rutes/{id}", get(handlers::get_route))
        // --- Vehicles (kendaraan) ---
        .route("/api/kendaraans", get(handlers::list_vehicles))
        .route("/api/kendaraans/{id}", get(handlers::get_vehicle))
        // --- Schedules (jadwal) ---
        // Each schedule is returned joined with its route under `rute`.
        .route("/api/jadwals", get(handlers::list_schedules))
        .route("/api/jadwals/{id}", get(handlers::get_schedule))
}
