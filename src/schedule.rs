use crate::{
    error::AppError,
    models::{
        CreateScheduleRequest, NewSchedule, Route, Schedule, SchedulePatch, ScheduleWithRoute,
        UpdateScheduleRequest, Vehicle,
    },
    repository::RepositoryState,
};

pub const ROUTE_NOT_FOUND: &str = "route not found";
pub const VEHICLE_NOT_FOUND: &str = "vehicle not found";
pub const SCHEDULE_NOT_FOUND: &str = "schedule not found";

/// ScheduleResolver
///
/// Bridges natural keys and stored references. On the write side it turns
/// `kode_rute` / `nomor_polisi` into route and vehicle ids before anything is
/// persisted; on the read side it joins each schedule with its route.
#[derive(Clone)]
pub struct ScheduleResolver {
    repo: RepositoryState,
}

impl ScheduleResolver {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// create_schedule
    ///
    /// Resolves the route, then the vehicle, and only then inserts. A miss on
    /// either lookup returns `NotFound` and leaves the store untouched.
    pub async fn create_schedule(&self, req: CreateScheduleRequest) -> Result<Schedule, AppError> {
        let req = req.validate()?;
        let route = self.route_by_code(&req.route_code).await?;
        let vehicle = self.vehicle_by_plate(&req.plate_number).await?;

        let schedule = self
            .repo
            .create_schedule(NewSchedule {
                date: req.date,
                departure_time: req.departure_time,
                estimated_arrival: req.estimated_arrival,
                route_id: route.id,
                vehicle_id: vehicle.id,
            })
            .await?;

        tracing::info!(
            schedule_id = %schedule.id,
            route_code = %route.code,
            plate = %vehicle.plate_number,
            "schedule created"
        );
        Ok(schedule)
    }

    /// update_schedule
    ///
    /// Partial update. Supplied natural keys are re-resolved with the same
    /// not-found rules as creation; the result comes back joined with its route.
    pub async fn update_schedule(
        &self,
        id: &str,
        req: UpdateScheduleRequest,
    ) -> Result<ScheduleWithRoute, AppError> {
        let req = req.validate()?;
        if self.repo.get_schedule(id).await?.is_none() {
            return Err(AppError::not_found(SCHEDULE_NOT_FOUND));
        }

        let route_id = match req.route_code.as_deref() {
            Some(code) => Some(self.route_by_code(code).await?.id),
            None => None,
        };
        let vehicle_id = match req.plate_number.as_deref() {
            Some(plate) => Some(self.vehicle_by_plate(plate).await?.id),
            None => None,
        };

        let patch = SchedulePatch {
            date: req.date,
            departure_time: req.departure_time,
            estimated_arrival: req.estimated_arrival,
            route_id,
            vehicle_id,
        };
        let schedule = self
            .repo
            .update_schedule(id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(SCHEDULE_NOT_FOUND))?;

        self.attach_route(schedule).await
    }

    /// get_schedule_with_route
    pub async fn get_schedule_with_route(&self, id: &str) -> Result<ScheduleWithRoute, AppError> {
        let schedule = self
            .repo
            .get_schedule(id)
            .await?
            .ok_or_else(|| AppError::not_found(SCHEDULE_NOT_FOUND))?;
        self.attach_route(schedule).await
    }

    /// list_schedules_with_route
    pub async fn list_schedules_with_route(&self) -> Result<Vec<ScheduleWithRoute>, AppError> {
        let schedules = self.repo.list_schedules().await?;
        let mut joined = Vec::with_capacity(schedules.len());
        for schedule in schedules {
            joined.push(self.attach_route(schedule).await?);
        }
        Ok(joined)
    }

    /// A dangling `route_id` is not an error: the schedule is returned with
    /// an empty route so one deleted route cannot break a whole listing.
    async fn attach_route(&self, schedule: Schedule) -> Result<ScheduleWithRoute, AppError> {
        let route = match self.repo.get_route(&schedule.route_id).await? {
            Some(route) => route,
            None => {
                tracing::warn!(
                    schedule_id = %schedule.id,
                    route_id = %schedule.route_id,
                    "schedule references a missing route"
                );
                Route::default()
            }
        };
        Ok(ScheduleWithRoute { schedule, route })
    }

    async fn route_by_code(&self, code: &str) -> Result<Route, AppError> {
        self.repo
            .find_route_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found(ROUTE_NOT_FOUND))
    }

    async fn vehicle_by_plate(&self, plate: &str) -> Result<Vehicle, AppError> {
        self.repo
            .find_vehicle_by_plate(plate)
            .await?
            .ok_or_else(|| AppError::not_found(VEHICLE_NOT_FOUND))
    }
}
