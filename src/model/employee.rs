use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Minimal employee identity joined onto attendance rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "name": "Jane Doe",
        "email": "jane.doe@company.com",
        "avatar_ref": "https://cdn.company.com/avatars/1.png"
    })
)]
pub struct EmployeeProfile {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "jane.doe@company.com")]
    pub email: String,

    #[schema(nullable = true)]
    pub avatar_ref: Option<String>,
}

impl EmployeeProfile {
    /// Case-insensitive substring match on name, email or employee code.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
            || self.employee_code.to_lowercase().contains(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> EmployeeProfile {
        EmployeeProfile {
            id: 7,
            employee_code: "EMP-007".into(),
            name: "Jane Doe".into(),
            email: "j.doe@company.com".into(),
            avatar_ref: None,
        }
    }

    #[test]
    fn matches_any_identity_field() {
        let p = jane();
        assert!(p.matches("jane"));
        assert!(p.matches("j.doe@"));
        assert!(p.matches("emp-007"));
        assert!(!p.matches("john"));
    }
}
