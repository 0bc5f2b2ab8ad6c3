use convene_db::models::{EventRow, UserRow};
use convene_types::models::Principal;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Forbidden,
}

impl Access {
    pub fn into_result(self) -> Result<(), ApiError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Forbidden => Err(ApiError::Forbidden),
        }
    }
}

/// A resource with a recorded owner.
pub trait Owned {
    fn is_owned_by(&self, principal: &Principal) -> bool;
}

/// Accounts: id, name and email must all match the session principal.
impl Owned for UserRow {
    fn is_owned_by(&self, principal: &Principal) -> bool {
        self.id == principal.id && self.name == principal.name && self.email == principal.email
    }
}

/// Events belong to their host.
impl Owned for EventRow {
    fn is_owned_by(&self, principal: &Principal) -> bool {
        self.host_id == principal.id
    }
}

pub fn authorize<R: Owned + ?Sized>(principal: &Principal, resource: &R) -> Access {
    if resource.is_owned_by(principal) {
        Access::Allowed
    } else {
        Access::Forbidden
    }
}
