use crate::actor::Actor;
use crate::directory::EmployeeDirectory;
use crate::error::{AttendanceError, Result};
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};
use std::collections::BTreeSet;

/// The verified bearer of the request, placed in request extensions by
/// [`auth_middleware`](crate::auth::middleware::auth_middleware).
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(AttendanceError::unauthenticated("Missing token").into())),
        }
    }
}

impl AuthUser {
    /// Resolve the core actor. HR users get the employees they manage as
    /// their visible scope; everyone else sees nobody.
    pub async fn into_actor(self, directory: &dyn EmployeeDirectory) -> Result<Actor> {
        let visible_employee_ids = if self.role == Role::Hr {
            directory.managed_employee_ids(self.user_id).await?
        } else {
            BTreeSet::new()
        };

        Ok(Actor {
            user_id: self.user_id,
            role: self.role,
            employee_id: self.employee_id,
            visible_employee_ids,
        })
    }
}
