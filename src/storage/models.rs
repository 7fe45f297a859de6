//! Database models for the interop server.
//!
//! These are the row types returned by SQLx queries.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{GpsPosition, ObstacleAccessLog, StationaryObstacle, User};
use crate::error::{InteropError, InteropResult};

/// Parse a TEXT UUID column.
pub fn parse_uuid(value: &str) -> InteropResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| InteropError::Internal(e.to_string()))
}

/// Parse an RFC 3339 TEXT timestamp column.
pub fn parse_timestamp(value: &str) -> InteropResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| InteropError::Internal(e.to_string()))
}

/// Database row for gps_positions table.
#[derive(Debug, Clone, FromRow)]
pub struct GpsPositionRow {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl TryFrom<GpsPositionRow> for GpsPosition {
    type Error = InteropError;

    fn try_from(row: GpsPositionRow) -> Result<Self, Self::Error> {
        Ok(GpsPosition {
            id: parse_uuid(&row.id)?,
            latitude: row.latitude,
            longitude: row.longitude,
        })
    }
}

/// Row for stationary obstacles joined with their centroid position.
#[derive(Debug, Clone, FromRow)]
pub struct StationaryObstacleRow {
    pub id: String,
    pub gps_position_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub cylinder_radius: f64,
    pub cylinder_height: f64,
    pub created_at: String,
}

impl TryFrom<StationaryObstacleRow> for StationaryObstacle {
    type Error = InteropError;

    fn try_from(row: StationaryObstacleRow) -> Result<Self, Self::Error> {
        Ok(StationaryObstacle {
            id: parse_uuid(&row.id)?,
            gps_position: GpsPosition {
                id: parse_uuid(&row.gps_position_id)?,
                latitude: row.latitude,
                longitude: row.longitude,
            },
            cylinder_radius: row.cylinder_radius,
            cylinder_height: row.cylinder_height,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

/// Database row for mission_configs table.
///
/// Positions and obstacles are loaded separately by the repository.
#[derive(Debug, Clone, FromRow)]
pub struct MissionConfigRow {
    pub id: String,
    pub is_active: i64,
    pub home_pos_id: String,
    pub emergent_last_known_pos_id: String,
    pub off_axis_odlc_pos_id: String,
    pub air_drop_pos_id: String,
    pub created_at: String,
}

/// Database row for users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_superuser: i64,
    pub created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = InteropError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            is_superuser: row.is_superuser != 0,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

/// Database row for obstacle_access_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct ObstacleAccessLogRow {
    pub id: String,
    pub user_id: String,
    pub timestamp: String,
}

impl TryFrom<ObstacleAccessLogRow> for ObstacleAccessLog {
    type Error = InteropError;

    fn try_from(row: ObstacleAccessLogRow) -> Result<Self, Self::Error> {
        Ok(ObstacleAccessLog {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            timestamp: parse_timestamp(&row.timestamp)?,
        })
    }
}
