use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::AppError;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

// --- Identity ---

/// Role
///
/// The RBAC field carried by users and session claims. Every self-registered
/// account is a `User`; admins are provisioned outside the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// User
///
/// Stored account. Never serialized: the password hash must not leave the
/// server, and the API only ever answers with a token and role.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// Account data handed to the store; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

// --- Transport entities ---

/// Route (rute)
///
/// A line between two places. `kode_rute` is the natural key schedules refer
/// to when they are created.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Route {
    /// Store-generated identifier. Empty on the placeholder route returned for
    /// schedules whose route has been deleted.
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "kode_rute")]
    pub code: String,
    #[serde(rename = "nama_rute")]
    pub name: String,
    #[serde(rename = "asal")]
    pub origin: String,
    #[serde(rename = "tujuan")]
    pub destination: String,
    /// Kilometres, always positive for stored routes.
    #[serde(rename = "jarak_km")]
    pub distance_km: i32,
}

/// Vehicle (kendaraan)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Vehicle {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "nomor_polisi")]
    pub plate_number: String,
    #[serde(rename = "jenis")]
    pub kind: String,
    #[serde(rename = "kapasitas")]
    pub capacity: i32,
    /// Free-text operational state, e.g. "aktif" or "servis".
    pub status: String,
}

/// Schedule (jadwal)
///
/// Holds denormalized references to one route and one vehicle: their ids
/// only, never copies of the records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Schedule {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "tanggal")]
    #[sqlx(rename = "schedule_date")]
    pub date: String,
    #[serde(rename = "waktu_berangkat")]
    pub departure_time: String,
    #[serde(rename = "estimasi_tiba")]
    pub estimated_arrival: String,
    #[serde(rename = "rute_id")]
    pub route_id: String,
    #[serde(rename = "kendaraan_id")]
    pub vehicle_id: String,
}

/// ScheduleWithRoute
///
/// Read-side view of a schedule joined with its route. `rute` is an empty
/// object when the referenced route no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ScheduleWithRoute {
    #[serde(flatten)]
    pub schedule: Schedule,
    #[serde(rename = "rute")]
    pub route: Route,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRoute {
    pub code: String,
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub distance_km: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVehicle {
    pub plate_number: String,
    pub kind: String,
    pub capacity: i32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSchedule {
    pub date: String,
    pub departure_time: String,
    pub estimated_arrival: String,
    pub route_id: String,
    pub vehicle_id: String,
}

/// Resolved partial update for a schedule: references are already ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulePatch {
    pub date: Option<String>,
    pub departure_time: Option<String>,
    pub estimated_arrival: Option<String>,
    pub route_id: Option<String>,
    pub vehicle_id: Option<String>,
}

// --- Request payloads ---
//
// Every payload is `#[serde(default)]` so an omitted field surfaces as a
// validation error (400) rather than a deserialization failure.

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct CreateRouteRequest {
    /// Must be absent: identifiers are assigned by the store.
    #[serde(rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "kode_rute")]
    pub code: String,
    #[serde(rename = "nama_rute")]
    pub name: String,
    #[serde(rename = "asal")]
    pub origin: String,
    #[serde(rename = "tujuan")]
    pub destination: String,
    #[serde(rename = "jarak_km")]
    pub distance_km: i32,
}

/// Partial update for a route. Only provided fields are replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct UpdateRouteRequest {
    #[serde(rename = "kode_rute", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "nama_rute", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "asal", skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(rename = "tujuan", skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(rename = "jarak_km", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct CreateVehicleRequest {
    /// Must be absent: identifiers are assigned by the store.
    #[serde(rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "nomor_polisi")]
    pub plate_number: String,
    #[serde(rename = "jenis")]
    pub kind: String,
    #[serde(rename = "kapasitas")]
    pub capacity: i32,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct UpdateVehicleRequest {
    #[serde(rename = "nomor_polisi", skip_serializing_if = "Option::is_none")]
    pub plate_number: Option<String>,
    #[serde(rename = "jenis", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "kapasitas", skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// CreateScheduleRequest
///
/// Schedules are created against natural keys: the caller names the route by
/// `kode_rute` and the vehicle by `nomor_polisi`, and the server resolves both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct CreateScheduleRequest {
    /// Must be absent: identifiers are assigned by the store.
    #[serde(rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "tanggal")]
    pub date: String,
    #[serde(rename = "waktu_berangkat")]
    pub departure_time: String,
    #[serde(rename = "estimasi_tiba")]
    pub estimated_arrival: String,
    #[serde(rename = "kode_rute")]
    pub route_code: String,
    #[serde(rename = "nomor_polisi")]
    pub plate_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct UpdateScheduleRequest {
    #[serde(rename = "tanggal", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "waktu_berangkat", skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    #[serde(rename = "estimasi_tiba", skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<String>,
    #[serde(rename = "kode_rute", skip_serializing_if = "Option::is_none")]
    pub route_code: Option<String>,
    #[serde(rename = "nomor_polisi", skip_serializing_if = "Option::is_none")]
    pub plate_number: Option<String>,
}

// --- Validation ---

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: &Option<String>, field: &str) -> Result<Option<String>, AppError> {
    value.as_deref().map(|v| required(v, field)).transpose()
}

fn positive(value: i32, field: &str) -> Result<i32, AppError> {
    if value <= 0 {
        return Err(AppError::Validation(format!("{field} must be greater than 0")));
    }
    Ok(value)
}

fn reject_client_id(id: &Option<String>) -> Result<(), AppError> {
    if id.is_some() {
        return Err(AppError::validation("identifiers are assigned by the server"));
    }
    Ok(())
}

/// Loose shape check: one `@`, non-empty local part, dotted domain, no spaces.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2 && !tld.ends_with('.'))
}

impl RegisterRequest {
    /// Returns the trimmed username and normalized email on success.
    pub fn validate(&self) -> Result<(String, Option<String>), AppError> {
        let username = self.username.trim();
        if username.is_empty() || self.password.is_empty() {
            return Err(AppError::validation("username and password are required"));
        }
        let email = match self.email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(email) if is_valid_email(email) => Some(email.to_lowercase()),
            Some(_) => return Err(AppError::validation("email format is invalid")),
        };
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.password != self.password_confirmation {
            return Err(AppError::validation("password confirmation does not match"));
        }
        Ok((username.to_string(), email))
    }
}

impl CreateRouteRequest {
    pub fn validate(&self) -> Result<NewRoute, AppError> {
        reject_client_id(&self.id)?;
        Ok(NewRoute {
            code: required(&self.code, "kode_rute")?,
            name: required(&self.name, "nama_rute")?,
            origin: required(&self.origin, "asal")?,
            destination: required(&self.destination, "tujuan")?,
            distance_km: positive(self.distance_km, "jarak_km")?,
        })
    }
}

impl UpdateRouteRequest {
    /// Trims provided fields and checks them against the route invariants.
    pub fn validate(&self) -> Result<UpdateRouteRequest, AppError> {
        Ok(UpdateRouteRequest {
            code: optional(&self.code, "kode_rute")?,
            name: optional(&self.name, "nama_rute")?,
            origin: optional(&self.origin, "asal")?,
            destination: optional(&self.destination, "tujuan")?,
            distance_km: self
                .distance_km
                .map(|d| positive(d, "jarak_km"))
                .transpose()?,
        })
    }
}

impl CreateVehicleRequest {
    pub fn validate(&self) -> Result<NewVehicle, AppError> {
        reject_client_id(&self.id)?;
        Ok(NewVehicle {
            plate_number: required(&self.plate_number, "nomor_polisi")?,
            kind: required(&self.kind, "jenis")?,
            capacity: positive(self.capacity, "kapasitas")?,
            status: required(&self.status, "status")?,
        })
    }
}

impl UpdateVehicleRequest {
    pub fn validate(&self) -> Result<UpdateVehicleRequest, AppError> {
        Ok(UpdateVehicleRequest {
            plate_number: optional(&self.plate_number, "nomor_polisi")?,
            kind: optional(&self.kind, "jenis")?,
            capacity: self
                .capacity
                .map(|c| positive(c, "kapasitas"))
                .transpose()?,
            status: optional(&self.status, "status")?,
        })
    }
}

impl CreateScheduleRequest {
    pub fn validate(&self) -> Result<CreateScheduleRequest, AppError> {
        reject_client_id(&self.id)?;
        Ok(CreateScheduleRequest {
            id: None,
            date: required(&self.date, "tanggal")?,
            departure_time: required(&self.departure_time, "waktu_berangkat")?,
            estimated_arrival: required(&self.estimated_arrival, "estimasi_tiba")?,
            route_code: required(&self.route_code, "kode_rute")?,
            plate_number: required(&self.plate_number, "nomor_polisi")?,
        })
    }
}

impl UpdateScheduleRequest {
    pub fn validate(&self) -> Result<UpdateScheduleRequest, AppError> {
        Ok(UpdateScheduleRequest {
            date: optional(&self.date, "tanggal")?,
            departure_time: optional(&self.departure_time, "waktu_berangkat")?,
            estimated_arrival: optional(&self.estimated_arrival, "estimasi_tiba")?,
            route_code: optional(&self.route_code, "kode_rute")?,
            plate_number: optional(&self.plate_number, "nomor_polisi")?,
        })
    }
}
