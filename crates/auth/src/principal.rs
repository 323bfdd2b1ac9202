use serde::{Deserialize, Serialize};

use detailr_core::ProfileId;

use crate::roles::UserRole;

/// An authenticated profile with its resolved platform role.
///
/// Built once per request from the session and handed explicitly to every
/// component that needs to know who is acting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub profile_id: ProfileId,
    pub role: UserRole,
}

impl Identity {
    pub fn new(profile_id: ProfileId, role: UserRole) -> Self {
        Self { profile_id, role }
    }
}
