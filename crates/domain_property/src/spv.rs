//! Special Purpose Vehicles
//!
//! Each property is owned by its own SPV; investors' shares are shares of
//! that SPV.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::SpvId;
use crate::error::PropertyError;

/// The legal entity holding title to a single property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spv {
    pub id: SpvId,
    /// Registered legal name
    pub name: String,
    /// Company registration number
    pub registration_number: String,
    /// Country or free zone of incorporation
    pub jurisdiction: String,
    pub created_at: DateTime<Utc>,
}

impl Spv {
    /// Creates a new SPV record
    pub fn new(
        name: impl Into<String>,
        registration_number: impl Into<String>,
        jurisdiction: impl Into<String>,
    ) -> Result<Self, PropertyError> {
        let name = name.into();
        let registration_number = registration_number.into();
        if name.trim().is_empty() || registration_number.trim().is_empty() {
            return Err(PropertyError::invalid("SPV name and registration number are required"));
        }

        Ok(Self {
            id: SpvId::new_v7(),
            name,
            registration_number,
            jurisdiction: jurisdiction.into(),
            created_at: Utc::now(),
        })
    }
}
