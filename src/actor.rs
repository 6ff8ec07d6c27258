use std::collections::BTreeSet;

use crate::error::{AttendanceError, Result};
use crate::model::role::Role;

/// The caller of a core operation, as resolved by the identity layer. The
/// core trusts the scope it is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: u64,
    pub role: Role,
    /// Present only if the user is linked to an employee record.
    pub employee_id: Option<u64>,
    /// Employees this actor may see in HR reports.
    pub visible_employee_ids: BTreeSet<u64>,
}

impl Actor {
    pub fn employee(user_id: u64, employee_id: u64) -> Self {
        Self {
            user_id,
            role: Role::Employee,
            employee_id: Some(employee_id),
            visible_employee_ids: BTreeSet::new(),
        }
    }

    pub fn hr(user_id: u64, visible_employee_ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            user_id,
            role: Role::Hr,
            employee_id: None,
            visible_employee_ids: visible_employee_ids.into_iter().collect(),
        }
    }

    /// The single authorization predicate for HR-only operations.
    pub fn require_hr(&self) -> Result<()> {
        if self.role == Role::Hr {
            Ok(())
        } else {
            Err(AttendanceError::authorization("HR only"))
        }
    }

    pub fn require_employee(&self) -> Result<u64> {
        self.employee_id
            .ok_or_else(|| AttendanceError::authorization("No employee profile"))
    }

    pub fn can_see(&self, employee_id: u64) -> bool {
        self.visible_employee_ids.contains(&employee_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_hr_passes_the_hr_check() {
        assert!(Actor::hr(1, [10, 11]).require_hr().is_ok());

        let mut admin = Actor::hr(2, []);
        admin.role = Role::Admin;
        assert!(matches!(
            admin.require_hr(),
            Err(AttendanceError::Authorization(_))
        ));
        assert!(Actor::employee(3, 30).require_hr().is_err());
    }

    #[test]
    fn employee_profile_is_required_for_self_service() {
        assert_eq!(Actor::employee(3, 30).require_employee().unwrap(), 30);
        assert!(matches!(
            Actor::hr(1, [10]).require_employee(),
            Err(AttendanceError::Authorization(_))
        ));
    }

    #[test]
    fn scope_is_exactly_the_visible_set() {
        let hr = Actor::hr(1, [10, 11]);
        assert!(hr.can_see(10));
        assert!(!hr.can_see(12));
    }
}
