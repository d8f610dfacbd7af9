use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Admin Router Module
///
/// Every mutating catalogue endpoint. Wrapped in `require_authenticated`
/// (401) and then `require_role(Role::Admin)` (403), so a signed-in `user`
/// can read the catalogue but never change it.
///
/// The paths overlap with the authenticated router; axum merges the method
/// routers per path, and each method keeps its own guards.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Routes (rute) ---
        // POST rejects a duplicate `kode_rute` with 409.
        .route("/api/rutes", post(handlers::create_route))
        .route(
            "/api/rutes/{id}",
            put(handlers::update_route).delete(handlers::delete_route),
        )
        // --- Vehicles (kendaraan) ---
        // POST rejects a duplicate `nomor_polisi` with 409.
        .route("/api/kendaraans", post(handlers::create_vehicle))
        .route(
            "/api/kendaraans/{id}",
            put(handlers::update_vehicle).delete(handlers::delete_vehicle),
        )
        // --- Schedules (jadwal) ---
        // POST resolves `kode_rute` and `nomor_polisi` before anything is stored.
        .route("/api/jadwals", post(handlers::create_schedule))
        .route(
            "/api/jadwals/{id}",
            put(handlers::update_schedule).delete(handlers::delete_schedule),
        )
}
