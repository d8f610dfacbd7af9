use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error as ThisError;
use uuid::Uuid;

use crate::models::{
    NewRoute, NewSchedule, NewUser, NewVehicle, Route, Schedule, SchedulePatch,
    UpdateRouteRequest, UpdateVehicleRequest, User, Vehicle,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

#[derive(Debug, ThisError)]
pub enum RepoError {
    /// A unique natural key (route code, plate number, username, email) is taken.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Repository Trait
///
/// The Entity Store contract. Handlers and the schedule resolver only ever
/// see `Arc<dyn Repository>`, so the Postgres store and the in-memory store
/// are interchangeable.
///
/// Identifiers are assigned by the implementation on create. Lookups that
/// miss return `Ok(None)` / `Ok(false)`; `Err` is reserved for store failures
/// and unique-key violations the store itself detects.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    // --- Routes ---
    async fn list_routes(&self) -> Result<Vec<Route>, RepoError>;
    async fn get_route(&self, id: &str) -> Result<Option<Route>, RepoError>;
    async fn find_route_by_code(&self, code: &str) -> Result<Option<Route>, RepoError>;
    async fn create_route(&self, route: NewRoute) -> Result<Route, RepoError>;
    async fn update_route(
        &self,
        id: &str,
        patch: UpdateRouteRequest,
    ) -> Result<Option<Route>, RepoError>;
    async fn delete_route(&self, id: &str) -> Result<bool, RepoError>;

    // --- Vehicles ---
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, RepoError>;
    async fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>, RepoError>;
    async fn find_vehicle_by_plate(&self, plate: &str) -> Result<Option<Vehicle>, RepoError>;
    async fn create_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, RepoError>;
    async fn update_vehicle(
        &self,
        id: &str,
        patch: UpdateVehicleRequest,
    ) -> Result<Option<Vehicle>, RepoError>;
    async fn delete_vehicle(&self, id: &str) -> Result<bool, RepoError>;

    // --- Schedules ---
    async fn list_schedules(&self) -> Result<Vec<Schedule>, RepoError>;
    async fn get_schedule(&self, id: &str) -> Result<Option<Schedule>, RepoError>;
    async fn create_schedule(&self, schedule: NewSchedule) -> Result<Schedule, RepoError>;
    async fn update_schedule(
        &self,
        id: &str,
        patch: SchedulePatch,
    ) -> Result<Option<Schedule>, RepoError>;
    async fn delete_schedule(&self, id: &str) -> Result<bool, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Generates a 24-character lowercase hex identifier: 4 bytes of unix
/// seconds followed by 8 random bytes, the layout of a document-store object id.
pub fn new_object_id() -> String {
    let secs = Utc::now().timestamp() as u32;
    let random = Uuid::new_v4().simple().to_string();
    format!("{secs:08x}{}", &random[..16])
}

/// True when `id` has the shape of a store identifier.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
