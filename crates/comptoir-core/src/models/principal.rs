//! Principal domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// An authenticated actor within a company or at platform scope.
///
/// Identity is immutable after creation. `company_id` and `role_id`
/// change only through administrative flows outside this core, never
/// by the principal itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    /// `None` denotes a platform-level actor not scoped to a company.
    pub company_id: Option<Uuid>,
    pub role_id: Uuid,
    pub role: Role,
}
