use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The authenticated identity, as issued by the external identity provider.
///
/// Opaque to this application: we never mutate it, only match its email
/// against jurisdiction documents and stamp its uid into resolution patches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    /// Provider-assigned subject identifier
    pub uid: String,
    /// Email used for jurisdiction matching
    pub email: String,
}

impl Identity {
    /// Value recorded as `resolvedBy` on a resolution patch
    pub fn resolver_tag(&self) -> &str {
        if self.uid.is_empty() {
            &self.email
        } else {
            &self.uid
        }
    }
}
