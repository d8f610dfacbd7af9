use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{ApiJson, AppError},
    models::{
        CreateRouteRequest, CreateScheduleRequest, CreateVehicleRequest, LoginRequest,
        LoginResponse, MessageResponse, NewUser, RegisterRequest, Role, Route, Schedule,
        ScheduleWithRoute, UpdateRouteRequest, UpdateScheduleRequest, UpdateVehicleRequest,
        Vehicle,
    },
    repository::is_valid_id,
};

/// The single login failure message, for unknown users and wrong passwords alike.
pub const INVALID_CREDENTIALS: &str = "invalid username or password";

fn parse_id(id: &str) -> Result<&str, AppError> {
    if is_valid_id(id) {
        Ok(id)
    } else {
        Err(AppError::validation("invalid id"))
    }
}

// --- Auth ---

/// register
///
/// [Public Route] Creates a `user`-role account. The uniqueness checks are
/// read-then-write; the Postgres unique indexes catch the race between them.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = MessageResponse),
        (status = 400, description = "Missing fields, short password or mismatch"),
        (status = 409, description = "Username or email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let (username, email) = payload.validate()?;

    if state.repo.find_user_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict("username already registered".to_string()));
    }
    if let Some(email) = email.as_deref() {
        if state.repo.find_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("email already registered".to_string()));
        }
    }

    let password_hash = state.hasher.hash(&payload.password).await?;
    let user = state
        .repo
        .create_user(NewUser {
            username,
            email,
            password_hash,
            role: Role::User,
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("user registered")),
    ))
}

/// login
///
/// [Public Route] Exchanges credentials for a session token. A missing user
/// still pays for one bcrypt comparison so response timing does not reveal
/// which usernames exist.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .repo
        .find_user_by_username(payload.username.trim())
        .await?;

    let verified = match &user {
        Some(user) => {
            state
                .hasher
                .verify(&payload.password, &user.password_hash)
                .await?
        }
        None => state.hasher.verify_missing(&payload.password).await?,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::info!(username = %payload.username, "login rejected");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let token = state.tokens.issue(&user)?;
    tracing::info!(user_id = %user.id, role = %user.role, "login succeeded");
    Ok(Json(LoginResponse {
        token,
        role: user.role,
    }))
}

// --- Routes (rute) ---

/// list_routes
///
/// [Authenticated Route] Full scan, unordered.
#[utoipa::path(
    get,
    path = "/api/rutes",
    responses((status = 200, description = "All routes", body = [Route])),
    security(("bearer_auth" = []))
)]
pub async fn list_routes(State(state): State<AppState>) -> Result<Json<Vec<Route>>, AppError> {
    Ok(Json(state.repo.list_routes().await?))
}

#[utoipa::path(
    get,
    path = "/api/rutes/{id}",
    params(("id" = String, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Found", body = Route),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Route>, AppError> {
    let id = parse_id(&id)?;
    state
        .repo
        .get_route(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("route not found"))
}

/// create_route
///
/// [Admin Route] Rejects a duplicate `kode_rute` with 409.
#[utoipa::path(
    post,
    path = "/api/rutes",
    request_body = CreateRouteRequest,
    responses(
        (status = 201, description = "Created", body = Route),
        (status = 409, description = "Route code already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_route(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateRouteRequest>,
) -> Result<(StatusCode, Json<Route>), AppError> {
    let new_route = payload.validate()?;
    if state
        .repo
        .find_route_by_code(&new_route.code)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("kode_rute already exists".to_string()));
    }

    let route = state.repo.create_route(new_route).await?;
    tracing::info!(route_id = %route.id, code = %route.code, "route created");
    Ok((StatusCode::CREATED, Json(route)))
}

#[utoipa::path(
    put,
    path = "/api/rutes/{id}",
    params(("id" = String, Path, description = "Route ID")),
    request_body = UpdateRouteRequest,
    responses(
        (status = 200, description = "Updated", body = Route),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Route code already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateRouteRequest>,
) -> Result<Json<Route>, AppError> {
    let id = parse_id(&id)?;
    let patch = payload.validate()?;

    if let Some(code) = patch.code.as_deref() {
        if let Some(existing) = state.repo.find_route_by_code(code).await? {
            if existing.id != id {
                return Err(AppError::Conflict("kode_rute already exists".to_string()));
            }
        }
    }

    state
        .repo
        .update_route(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("route not found"))
}

/// delete_route
///
/// [Admin Route] Schedules pointing at the route are left in place and will
/// be served with an empty route.
#[utoipa::path(
    delete,
    path = "/api/rutes/{id}",
    params(("id" = String, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    if !state.repo.delete_route(id).await? {
        return Err(AppError::not_found("route not found"));
    }
    tracing::info!(route_id = %id, "route deleted");
    Ok(Json(MessageResponse::new("route deleted")))
}

// --- Vehicles (kendaraan) ---

#[utoipa::path(
    get,
    path = "/api/kendaraans",
    responses((status = 200, description = "All vehicles", body = [Vehicle])),
    security(("bearer_auth" = []))
)]
pub async fn list_vehicles(
    State(state): State<AppState>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    Ok(Json(state.repo.list_vehicles().await?))
}

#[utoipa::path(
    get,
    path = "/api/kendaraans/{id}",
    params(("id" = String, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Found", body = Vehicle),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vehicle>, AppError> {
    let id = parse_id(&id)?;
    state
        .repo
        .get_vehicle(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("vehicle not found"))
}

#[utoipa::path(
    post,
    path = "/api/kendaraans",
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Created", body = Vehicle),
        (status = 409, description = "Plate number already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_vehicle(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let new_vehicle = payload.validate()?;
    if state
        .repo
        .find_vehicle_by_plate(&new_vehicle.plate_number)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("nomor_polisi already exists".to_string()));
    }

    let vehicle = state.repo.create_vehicle(new_vehicle).await?;
    tracing::info!(vehicle_id = %vehicle.id, plate = %vehicle.plate_number, "vehicle created");
    Ok((StatusCode::CREATED, Json(vehicle)))
}

#[utoipa::path(
    put,
    path = "/api/kendaraans/{id}",
    params(("id" = String, Path, description = "Vehicle ID")),
    request_body = UpdateVehicleRequest,
    responses(
        (status = 200, description = "Updated", body = Vehicle),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Plate number already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    let id = parse_id(&id)?;
    let patch = payload.validate()?;

    if let Some(plate) = patch.plate_number.as_deref() {
        if let Some(existing) = state.repo.find_vehicle_by_plate(plate).await? {
            if existing.id != id {
                return Err(AppError::Conflict("nomor_polisi already exists".to_string()));
            }
        }
    }

    state
        .repo
        .update_vehicle(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("vehicle not found"))
}

#[utoipa::path(
    delete,
    path = "/api/kendaraans/{id}",
    params(("id" = String, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    if !state.repo.delete_vehicle(id).await? {
        return Err(AppError::not_found("vehicle not found"));
    }
    tracing::info!(vehicle_id = %id, "vehicle deleted");
    Ok(Json(MessageResponse::new("vehicle deleted")))
}

// --- Schedules (jadwal) ---

/// list_schedules
///
/// [Authenticated Route] Every schedule joined with its route.
#[utoipa::path(
    get,
    path = "/api/jadwals",
    responses((status = 200, description = "All schedules", body = [ScheduleWithRoute])),
    security(("bearer_auth" = []))
)]
pub async fn list_schedules(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleWithRoute>>, AppError> {
    Ok(Json(state.schedules().list_schedules_with_route().await?))
}

#[utoipa::path(
    get,
    path = "/api/jadwals/{id}",
    params(("id" = String, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Found", body = ScheduleWithRoute),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleWithRoute>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.schedules().get_schedule_with_route(id).await?))
}

/// create_schedule
///
/// [Admin Route] Takes `kode_rute` and `nomor_polisi`, not ids.
#[utoipa::path(
    post,
    path = "/api/jadwals",
    request_body = CreateScheduleRequest,
    responses(
        (status = 201, description = "Created", body = Schedule),
        (status = 404, description = "Route or vehicle not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_schedule(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<Schedule>), AppError> {
    let schedule = state.schedules().create_schedule(payload).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

#[utoipa::path(
    put,
    path = "/api/jadwals/{id}",
    params(("id" = String, Path, description = "Schedule ID")),
    request_body = UpdateScheduleRequest,
    responses(
        (status = 200, description = "Updated", body = ScheduleWithRoute),
        (status = 404, description = "Schedule, route or vehicle not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateScheduleRequest>,
) -> Result<Json<ScheduleWithRoute>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.schedules().update_schedule(id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/jadwals/{id}",
    params(("id" = String, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    if !state.repo.delete_schedule(id).await? {
        return Err(AppError::not_found("schedule not found"));
    }
    tracing::info!(schedule_id = %id, "schedule deleted");
    Ok(Json(MessageResponse::new("schedule deleted")))
}
