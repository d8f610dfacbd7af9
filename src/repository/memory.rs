use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RepoError, Repository, new_object_id};
use crate::models::{
    NewRoute, NewSchedule, NewUser, NewVehicle, Route, Schedule, SchedulePatch,
    UpdateRouteRequest, UpdateVehicleRequest, User, Vehicle,
};

/// InMemoryRepository
///
/// A process-local Entity Store used by the test suites and by `STORE=memory`
/// runs. It deliberately has no unique indexes: natural-key uniqueness rests
/// entirely on the handlers' check-then-insert, which is what the
/// concurrency tests exercise.
#[derive(Default)]
pub struct InMemoryRepository {
    /// When true, every operation fails as if the database were unreachable.
    pub should_fail: bool,
    users: RwLock<HashMap<String, User>>,
    routes: RwLock<HashMap<String, Route>>,
    vehicles: RwLock<HashMap<String, Vehicle>>,
    schedules: RwLock<HashMap<String, Schedule>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Inserts a fully-formed user, bypassing registration. Used to seed admin accounts.
    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn schedule_count(&self) -> usize {
        self.schedules.read().await.len()
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.should_fail {
            return Err(RepoError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        self.check()?;
        let user = User {
            id: new_object_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        };
        self.users.write().await.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        self.check()?;
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.check()?;
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list_routes(&self) -> Result<Vec<Route>, RepoError> {
        self.check()?;
        Ok(self.routes.read().await.values().cloned().collect())
    }

    async fn get_route(&self, id: &str) -> Result<Option<Route>, RepoError> {
        self.check()?;
        Ok(self.routes.read().await.get(id).cloned())
    }

    async fn find_route_by_code(&self, code: &str) -> Result<Option<Route>, RepoError> {
        self.check()?;
        let routes = self.routes.read().await;
        Ok(routes.values().find(|r| r.code == code).cloned())
    }

    async fn create_route(&self, route: NewRoute) -> Result<Route, RepoError> {
        self.check()?;
        let route = Route {
            id: new_object_id(),
            code: route.code,
            name: route.name,
            origin: route.origin,
            destination: route.destination,
            distance_km: route.distance_km,
        };
        self.routes.write().await.insert(route.id.clone(), route.clone());
        Ok(route)
    }

    async fn update_route(
        &self,
        id: &str,
        patch: UpdateRouteRequest,
    ) -> Result<Option<Route>, RepoError> {
        self.check()?;
        let mut routes = self.routes.write().await;
        let Some(route) = routes.get_mut(id) else {
            return Ok(None);
        };
        if let Some(code) = patch.code {
            route.code = code;
        }
        if let Some(name) = patch.name {
            route.name = name;
        }
        if let Some(origin) = patch.origin {
            route.origin = origin;
        }
        if let Some(destination) = patch.destination {
            route.destination = destination;
        }
        if let Some(distance_km) = patch.distance_km {
            route.distance_km = distance_km;
        }
        Ok(Some(route.clone()))
    }

    async fn delete_route(&self, id: &str) -> Result<bool, RepoError> {
        self.check()?;
        Ok(self.routes.write().await.remove(id).is_some())
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, RepoError> {
        self.check()?;
        Ok(self.vehicles.read().await.values().cloned().collect())
    }

    async fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>, RepoError> {
        self.check()?;
        Ok(self.vehicles.read().await.get(id).cloned())
    }

    async fn find_vehicle_by_plate(&self, plate: &str) -> Result<Option<Vehicle>, RepoError> {
        self.check()?;
        let vehicles = self.vehicles.read().await;
        Ok(vehicles.values().find(|v| v.plate_number == plate).cloned())
    }

    async fn create_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, RepoError> {
        self.check()?;
        let vehicle = Vehicle {
            id: new_object_id(),
            plate_number: vehicle.plate_number,
            kind: vehicle.kind,
            capacity: vehicle.capacity,
            status: vehicle.status,
        };
        self.vehicles
            .write()
            .await
            .insert(vehicle.id.clone(), vehicle.clone());
        Ok(vehicle)
    }

    async fn update_vehicle(
        &self,
        id: &str,
        patch: UpdateVehicleRequest,
    ) -> Result<Option<Vehicle>, RepoError> {
        self.check()?;
        let mut vehicles = self.vehicles.write().await;
        let Some(vehicle) = vehicles.get_mut(id) else {
            return Ok(None);
        };
        if let Some(plate_number) = patch.plate_number {
            vehicle.plate_number = plate_number;
        }
        if let Some(kind) = patch.kind {
            vehicle.kind = kind;
        }
        if let Some(capacity) = patch.capacity {
            vehicle.capacity = capacity;
        }
        if let Some(status) = patch.status {
            vehicle.status = status;
        }
        Ok(Some(vehicle.clone()))
    }

    async fn delete_vehicle(&self, id: &str) -> Result<bool, RepoError> {
        self.check()?;
        Ok(self.vehicles.write().await.remove(id).is_some())
    }

    async fn list_schedules(&self) -> Result<Vec<Schedule>, RepoError> {
        self.check()?;
        Ok(self.schedules.read().await.values().cloned().collect())
    }

    async fn get_schedule(&self, id: &str) -> Result<Option<Schedule>, RepoError> {
        self.check()?;
        Ok(self.schedules.read().await.get(id).cloned())
    }

    async fn create_schedule(&self, schedule: NewSchedule) -> Result<Schedule, RepoError> {
        self.check()?;
        let schedule = Schedule {
            id: new_object_id(),
            date: schedule.date,
            departure_time: schedule.departure_time,
            estimated_arrival: schedule.estimated_arrival,
            route_id: schedule.route_id,
            vehicle_id: schedule.vehicle_id,
        };
        self.schedules
            .write()
            .await
            .insert(schedule.id.clone(), schedule.clone());
        Ok(schedule)
    }

    async fn update_schedule(
        &self,
        id: &str,
        patch: SchedulePatch,
    ) -> Result<Option<Schedule>, RepoError> {
        self.check()?;
        let mut schedules = self.schedules.write().await;
        let Some(schedule) = schedules.get_mut(id) else {
            return Ok(None);
        };
        if let Some(date) = patch.date {
            schedule.date = date;
        }
        if let Some(departure_time) = patch.departure_time {
            schedule.departure_time = departure_time;
        }
        if let Some(estimated_arrival) = patch.estimated_arrival {
            schedule.estimated_arrival = estimated_arrival;
        }
        if let Some(route_id) = patch.route_id {
            schedule.route_id = route_id;
        }
        if let Some(vehicle_id) = patch.vehicle_id {
            schedule.vehicle_id = vehicle_id;
        }
        Ok(Some(schedule.clone()))
    }

    async fn delete_schedule(&self, id: &str) -> Result<bool, RepoError> {
        self.check()?;
        Ok(self.schedules.write().await.remove(id).is_some())
    }
}
