//! Identities and the capability rules evaluated before mutating operations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{EventError, EventResult};
use crate::models::user::UserType;

/// An authenticated caller as vouched for by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub user_type: UserType,
}

/// The caller of a request, which may be anonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Authenticated(Identity),
}

impl Viewer {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(identity) => Some(identity),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create, update and delete events.
    ManageEvents,
}

impl Capability {
    fn describe(&self) -> &'static str {
        match self {
            Capability::ManageEvents => "Only admins can manage events",
        }
    }
}

impl Identity {
    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManageEvents => self.user_type == UserType::Admin,
        }
    }
}

/// Fails with `EventError::Permission` unless `identity` holds `capability`.
pub fn authorize(identity: &Identity, capability: Capability) -> EventResult<()> {
    if identity.can(capability) {
        Ok(())
    } else {
        Err(EventError::Permission(capability.describe().to_string()))
    }
}
