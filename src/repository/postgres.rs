use std::{future::Future, time::Duration};

use async_trait::async_trait;
use sqlx::PgPool;

use super::{RepoError, Repository, new_object_id};
use crate::models::{
    NewRoute, NewSchedule, NewUser, NewVehicle, Route, Schedule, SchedulePatch,
    UpdateRouteRequest, UpdateVehicleRequest, User, Vehicle,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, role";
const ROUTE_COLUMNS: &str = "id, code, name, origin, destination, distance_km";
const VEHICLE_COLUMNS: &str = "id, plate_number, kind, capacity, status";
const SCHEDULE_COLUMNS: &str =
    "id, schedule_date, departure_time, estimated_arrival, route_id, vehicle_id";

/// PostgresRepository
///
/// The concrete Entity Store backed by PostgreSQL. Every round trip is
/// wrapped in `timeout` so a slow or unreachable database fails the request
/// instead of hanging it.
pub struct PostgresRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), RepoError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => result.map_err(map_db_error),
            Err(_) => Err(RepoError::Timeout(self.timeout)),
        }
    }
}

/// Translates unique-index violations into `Conflict` naming the natural key.
fn map_db_error(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let key = match db_err.constraint() {
                Some("users_username_key") => "username",
                Some("users_email_key") => "email",
                Some("routes_code_key") => "kode_rute",
                Some("vehicles_plate_number_key") => "nomor_polisi",
                _ => "record",
            };
            return RepoError::Conflict(key.to_string());
        }
    }
    RepoError::Database(err)
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        self.bounded(
            sqlx::query_as::<_, User>(&sql)
                .bind(new_object_id())
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.role.as_str())
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        self.bounded(
            sqlx::query_as::<_, User>(&sql)
                .bind(username)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        self.bounded(
            sqlx::query_as::<_, User>(&sql)
                .bind(email)
                .fetch_optional(&self.pool),
        )
        .await
    }

    // --- ROUTES ---

    async fn list_routes(&self) -> Result<Vec<Route>, RepoError> {
        let sql = format!("SELECT {ROUTE_COLUMNS} FROM routes");
        self.bounded(sqlx::query_as::<_, Route>(&sql).fetch_all(&self.pool))
            .await
    }

    async fn get_route(&self, id: &str) -> Result<Option<Route>, RepoError> {
        let sql = format!("SELECT {ROUTE_COLUMNS} FROM routes WHERE id = $1");
        self.bounded(
            sqlx::query_as::<_, Route>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_route_by_code(&self, code: &str) -> Result<Option<Route>, RepoError> {
        let sql = format!("SELECT {ROUTE_COLUMNS} FROM routes WHERE code = $1");
        self.bounded(
            sqlx::query_as::<_, Route>(&sql)
                .bind(code)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn create_route(&self, route: NewRoute) -> Result<Route, RepoError> {
        let sql = format!(
            "INSERT INTO routes (id, code, name, origin, destination, distance_km) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ROUTE_COLUMNS}"
        );
        self.bounded(
            sqlx::query_as::<_, Route>(&sql)
                .bind(new_object_id())
                .bind(&route.code)
                .bind(&route.name)
                .bind(&route.origin)
                .bind(&route.destination)
                .bind(route.distance_km)
                .fetch_one(&self.pool),
        )
        .await
    }

    /// Partial update: `COALESCE` keeps the stored value for every `None` field.
    async fn update_route(
        &self,
        id: &str,
        patch: UpdateRouteRequest,
    ) -> Result<Option<Route>, RepoError> {
        let sql = format!(
            "UPDATE routes SET code = COALESCE($2, code), name = COALESCE($3, name), \
             origin = COALESCE($4, origin), destination = COALESCE($5, destination), \
             distance_km = COALESCE($6, distance_km) \
             WHERE id = $1 RETURNING {ROUTE_COLUMNS}"
        );
        self.bounded(
            sqlx::query_as::<_, Route>(&sql)
                .bind(id)
                .bind(patch.code)
                .bind(patch.name)
                .bind(patch.origin)
                .bind(patch.destination)
                .bind(patch.distance_km)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_route(&self, id: &str) -> Result<bool, RepoError> {
        let result = self
            .bounded(
                sqlx::query("DELETE FROM routes WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- VEHICLES ---

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, RepoError> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles");
        self.bounded(sqlx::query_as::<_, Vehicle>(&sql).fetch_all(&self.pool))
            .await
    }

    async fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>, RepoError> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1");
        self.bounded(
            sqlx::query_as::<_, Vehicle>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_vehicle_by_plate(&self, plate: &str) -> Result<Option<Vehicle>, RepoError> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE plate_number = $1");
        self.bounded(
            sqlx::query_as::<_, Vehicle>(&sql)
                .bind(plate)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn create_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, RepoError> {
        let sql = format!(
            "INSERT INTO vehicles (id, plate_number, kind, capacity, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {VEHICLE_COLUMNS}"
        );
        self.bounded(
            sqlx::query_as::<_, Vehicle>(&sql)
                .bind(new_object_id())
                .bind(&vehicle.plate_number)
                .bind(&vehicle.kind)
                .bind(vehicle.capacity)
                .bind(&vehicle.status)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn update_vehicle(
        &self,
        id: &str,
        patch: UpdateVehicleRequest,
    ) -> Result<Option<Vehicle>, RepoError> {
        let sql = format!(
            "UPDATE vehicles SET plate_number = COALESCE($2, plate_number), \
             kind = COALESCE($3, kind), capacity = COALESCE($4, capacity), \
             status = COALESCE($5, status) \
             WHERE id = $1 RETURNING {VEHICLE_COLUMNS}"
        );
        self.bounded(
            sqlx::query_as::<_, Vehicle>(&sql)
                .bind(id)
                .bind(patch.plate_number)
                .bind(patch.kind)
                .bind(patch.capacity)
                .bind(patch.status)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_vehicle(&self, id: &str) -> Result<bool, RepoError> {
        let result = self
            .bounded(
                sqlx::query("DELETE FROM vehicles WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- SCHEDULES ---

    async fn list_schedules(&self) -> Result<Vec<Schedule>, RepoError> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedules");
        self.bounded(sqlx::query_as::<_, Schedule>(&sql).fetch_all(&self.pool))
            .await
    }

    async fn get_schedule(&self, id: &str) -> Result<Option<Schedule>, RepoError> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1");
        self.bounded(
            sqlx::query_as::<_, Schedule>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn create_schedule(&self, schedule: NewSchedule) -> Result<Schedule, RepoError> {
        let sql = format!(
            "INSERT INTO schedules ({SCHEDULE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {SCHEDULE_COLUMNS}"
        );
        self.bounded(
            sqlx::query_as::<_, Schedule>(&sql)
                .bind(new_object_id())
                .bind(&schedule.date)
                .bind(&schedule.departure_time)
                .bind(&schedule.estimated_arrival)
                .bind(&schedule.route_id)
                .bind(&schedule.vehicle_id)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn update_schedule(
        &self,
        id: &str,
        patch: SchedulePatch,
    ) -> Result<Option<Schedule>, RepoError> {
        let sql = format!(
            "UPDATE schedules SET schedule_date = COALESCE($2, schedule_date), \
             departure_time = COALESCE($3, departure_time), \
             estimated_arrival = COALESCE($4, estimated_arrival), \
             route_id = COALESCE($5, route_id), vehicle_id = COALESCE($6, vehicle_id) \
             WHERE id = $1 RETURNING {SCHEDULE_COLUMNS}"
        );
        self.bounded(
            sqlx::query_as::<_, Schedule>(&sql)
                .bind(id)
                .bind(patch.date)
                .bind(patch.departure_time)
                .bind(patch.estimated_arrival)
                .bind(patch.route_id)
                .bind(patch.vehicle_id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_schedule(&self, id: &str) -> Result<bool, RepoError> {
        let result = self
            .bounded(
                sqlx::query("DELETE FROM schedules WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
