//! Mission configuration domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{GpsPosition, StationaryObstacle};

/// The set of positions and obstacles governing a competition run.
///
/// At most one configuration is active at a time; the obstacle endpoint
/// reports against that one.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MissionConfig {
    /// Unique identifier.
    pub id: Uuid,
    /// Whether this is the active mission.
    pub is_active: bool,
    /// Launch and recovery position.
    pub home_pos: GpsPosition,
    /// Last known position of the emergent target.
    pub emergent_last_known_pos: GpsPosition,
    /// Position of the off-axis target.
    pub off_axis_odlc_pos: GpsPosition,
    /// Air drop target position.
    pub air_drop_pos: GpsPosition,
    /// Obstacles attached to this mission.
    pub stationary_obstacles: Vec<StationaryObstacle>,
    /// When this configuration was created.
    pub created_at: DateTime<Utc>,
}

impl MissionConfig {
    /// Create a new, inactive mission with no obstacles.
    pub fn new(
        home_pos: GpsPosition,
        emergent_last_known_pos: GpsPosition,
        off_axis_odlc_pos: GpsPosition,
        air_drop_pos: GpsPosition,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            is_active: false,
            home_pos,
            emergent_last_known_pos,
            off_axis_odlc_pos,
            air_drop_pos,
            stationary_obstacles: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a mission with every reference position at `pos`.
    pub fn at(pos: GpsPosition) -> Self {
        Self::new(pos, pos, pos, pos)
    }

    /// Reference positions in a fixed order: home, emergent, off-axis, air drop.
    pub fn positions(&self) -> [&GpsPosition; 4] {
        [
            &self.home_pos,
            &self.emergent_last_known_pos,
            &self.off_axis_odlc_pos,
            &self.air_drop_pos,
        ]
    }
}
