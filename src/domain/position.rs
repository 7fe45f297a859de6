//! Geographic position domain types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{InteropError, InteropResult};

/// A GPS position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GpsPosition {
    /// Unique identifier.
    pub id: Uuid,
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl GpsPosition {
    /// Create a new position, rejecting coordinates off the globe.
    pub fn new(latitude: f64, longitude: f64) -> InteropResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(InteropError::BadRequest(format!(
                "Latitude {} is outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(InteropError::BadRequest(format!(
                "Longitude {} is outside [-180, 180]",
                longitude
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            latitude,
            longitude,
        })
    }
}
