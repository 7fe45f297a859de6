//! API request and response types.
//!
//! Wire names are camelCase, the convention competition clients expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{GpsPosition, MissionConfig, ObstacleAccessLog, StationaryObstacle, User};

// ==================== Obstacles ====================

/// One stationary obstacle as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StationaryObstacleReport {
    /// Centroid latitude in degrees.
    pub latitude: f64,
    /// Centroid longitude in degrees.
    pub longitude: f64,
    /// Cylinder radius in feet.
    pub radius: f64,
    /// Cylinder height in feet.
    pub height: f64,
}

impl From<&StationaryObstacle> for StationaryObstacleReport {
    fn from(obstacle: &StationaryObstacle) -> Self {
        Self {
            latitude: obstacle.gps_position.latitude,
            longitude: obstacle.gps_position.longitude,
            radius: obstacle.cylinder_radius,
            height: obstacle.cylinder_height,
        }
    }
}

/// Response for the obstacle listing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObstaclesResponse {
    pub stationary_obstacles: Vec<StationaryObstacleReport>,
}

impl From<&MissionConfig> for ObstaclesResponse {
    fn from(mission: &MissionConfig) -> Self {
        Self {
            stationary_obstacles: mission
                .stationary_obstacles
                .iter()
                .map(StationaryObstacleReport::from)
                .collect(),
        }
    }
}

// ==================== Missions ====================

/// A position in requests and responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct PositionBody {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&GpsPosition> for PositionBody {
    fn from(position: &GpsPosition) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
        }
    }
}

/// Request to create a mission configuration.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMissionRequest {
    pub home_pos: PositionBody,
    pub emergent_last_known_pos: PositionBody,
    pub off_axis_odlc_pos: PositionBody,
    pub air_drop_pos: PositionBody,
    #[serde(default)]
    pub stationary_obstacles: Vec<StationaryObstacleReport>,
    /// Make this the active mission once created.
    #[serde(default)]
    pub active: bool,
}

/// A mission configuration as returned to administrators.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MissionResponse {
    pub id: Uuid,
    pub is_active: bool,
    pub home_pos: PositionBody,
    pub emergent_last_known_pos: PositionBody,
    pub off_axis_odlc_pos: PositionBody,
    pub air_drop_pos: PositionBody,
    pub stationary_obstacles: Vec<StationaryObstacleReport>,
}

impl From<&MissionConfig> for MissionResponse {
    fn from(mission: &MissionConfig) -> Self {
        Self {
            id: mission.id,
            is_active: mission.is_active,
            home_pos: (&mission.home_pos).into(),
            emergent_last_known_pos: (&mission.emergent_last_known_pos).into(),
            off_axis_odlc_pos: (&mission.off_axis_odlc_pos).into(),
            air_drop_pos: (&mission.air_drop_pos).into(),
            stationary_obstacles: mission
                .stationary_obstacles
                .iter()
                .map(StationaryObstacleReport::from)
                .collect(),
        }
    }
}

/// Response for listing missions.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListMissionsResponse {
    pub missions: Vec<MissionResponse>,
}

// ==================== Users ====================

/// Request to create a user account.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_superuser: bool,
}

/// One read of the obstacle list.
#[derive(Debug, Serialize, ToSchema)]
pub struct ObstacleAccessEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl From<&ObstacleAccessLog> for ObstacleAccessEntry {
    fn from(log: &ObstacleAccessLog) -> Self {
        Self {
            id: log.id,
            timestamp: log.timestamp,
        }
    }
}

/// A user's obstacle reads, oldest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct ObstacleAccessesResponse {
    pub user: UserInfo,
    pub accesses: Vec<ObstacleAccessEntry>,
}

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Database connectivity.
    pub database: String,
    /// Timestamp.
    pub timestamp: String,
}

// ==================== Authentication ====================

/// Login request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Session token, also set as the `sessionid` cookie.
    pub token: String,
    /// Session lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Logout response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// User information.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub is_superuser: bool,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_superuser: user.is_superuser,
        }
    }
}
