use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The pincode set the authenticated organisation is authorised to see.
/// Empty means no jurisdiction is configured for the organisation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JurisdictionResponseDto {
    pub pincodes: Vec<String>,
}
