//! Stationary obstacle domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::GpsPosition;
use crate::error::{InteropError, InteropResult};

/// A fixed cylindrical no-fly hazard.
///
/// The cylinder stands on the ground at `gps_position`; radius and height
/// are in feet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StationaryObstacle {
    /// Unique identifier.
    pub id: Uuid,
    /// Centroid of the cylinder.
    pub gps_position: GpsPosition,
    /// Cylinder radius in feet.
    pub cylinder_radius: f64,
    /// Cylinder height in feet.
    pub cylinder_height: f64,
    /// When this obstacle was created.
    pub created_at: DateTime<Utc>,
}

impl StationaryObstacle {
    /// Create a new obstacle centred on `gps_position`.
    pub fn new(
        gps_position: GpsPosition,
        cylinder_radius: f64,
        cylinder_height: f64,
    ) -> InteropResult<Self> {
        if !cylinder_radius.is_finite() || cylinder_radius <= 0.0 {
            return Err(InteropError::BadRequest(format!(
                "Cylinder radius must be positive, got {}",
                cylinder_radius
            )));
        }
        if !cylinder_height.is_finite() || cylinder_height <= 0.0 {
            return Err(InteropError::BadRequest(format!(
                "Cylinder height must be positive, got {}",
                cylinder_height
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            gps_position,
            cylinder_radius,
            cylinder_height,
            created_at: Utc::now(),
        })
    }
}
