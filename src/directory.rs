//! Read-only access to the personnel application's employee registry.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use sqlx::MySqlPool;

use crate::error::Result;
use crate::model::employee::EmployeeProfile;

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Profiles for the ids that exist; unknown ids are skipped.
    async fn employees_by_ids(&self, ids: &[u64]) -> Result<Vec<EmployeeProfile>>;

    /// Employees an HR user manages, i.e. that user's visible scope.
    async fn managed_employee_ids(&self, hr_user_id: u64) -> Result<BTreeSet<u64>>;
}

const MAX_IDS_PER_QUERY: usize = 1000;

pub struct MySqlEmployeeDirectory {
    pool: MySqlPool,
}

impl MySqlEmployeeDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for MySqlEmployeeDirectory {
    async fn employees_by_ids(&self, ids: &[u64]) -> Result<Vec<EmployeeProfile>> {
        let mut profiles = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                r#"
                SELECT
                    id,
                    employee_code,
                    CONCAT_WS(' ', first_name, last_name) AS name,
                    email,
                    avatar_url AS avatar_ref
                FROM employees
                WHERE id IN ({placeholders})
                "#
            );

            let mut query = sqlx::query_as::<_, EmployeeProfile>(&sql);
            for id in chunk {
                query = query.bind(*id);
            }
            profiles.extend(query.fetch_all(&self.pool).await?);
        }

        Ok(profiles)
    }

    async fn managed_employee_ids(&self, hr_user_id: u64) -> Result<BTreeSet<u64>> {
        let ids = sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE hr_user_id = ?")
            .bind(hr_user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().collect())
    }
}

/// Caches profiles in front of another directory. Scope lookups always go to
/// the inner directory so a revoked assignment takes effect immediately.
pub struct CachedEmployeeDirectory<D> {
    inner: D,
    profiles: Cache<u64, EmployeeProfile>,
}

impl<D: EmployeeDirectory> CachedEmployeeDirectory<D> {
    pub fn new(inner: D, ttl: Duration) -> Self {
        Self {
            inner,
            profiles: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl<D: EmployeeDirectory> EmployeeDirectory for CachedEmployeeDirectory<D> {
    async fn employees_by_ids(&self, ids: &[u64]) -> Result<Vec<EmployeeProfile>> {
        let mut profiles = Vec::with_capacity(ids.len());
        let mut misses = Vec::new();

        for id in ids {
            match self.profiles.get(id).await {
                Some(profile) => profiles.push(profile),
                None => misses.push(*id),
            }
        }

        if !misses.is_empty() {
            let fetched = self.inner.employees_by_ids(&misses).await?;
            let inserts: Vec<_> = fetched
                .iter()
                .map(|p| self.profiles.insert(p.id, p.clone()))
                .collect();
            futures::future::join_all(inserts).await;

            tracing::debug!(
                hits = profiles.len(),
                misses = misses.len(),
                "Employee profile cache lookup"
            );
            profiles.extend(fetched);
        }

        Ok(profiles)
    }

    async fn managed_employee_ids(&self, hr_user_id: u64) -> Result<BTreeSet<u64>> {
        self.inner.managed_employee_ids(hr_user_id).await
    }
}

/// Fixed directory for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmployeeDirectory {
    profiles: HashMap<u64, EmployeeProfile>,
    managers: HashMap<u64, BTreeSet<u64>>,
}

impl InMemoryEmployeeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `profile`, managed by `hr_user_id`.
    pub fn with_employee(mut self, profile: EmployeeProfile, hr_user_id: u64) -> Self {
        self.managers.entry(hr_user_id).or_default().insert(profile.id);
        self.profiles.insert(profile.id, profile);
        self
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryEmployeeDirectory {
    async fn employees_by_ids(&self, ids: &[u64]) -> Result<Vec<EmployeeProfile>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.profiles.get(id).cloned())
            .collect())
    }

    async fn managed_employee_ids(&self, hr_user_id: u64) -> Result<BTreeSet<u64>> {
        Ok(self.managers.get(&hr_user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn profile(id: u64, name: &str) -> EmployeeProfile {
        EmployeeProfile {
            id,
            employee_code: format!("EMP-{id:03}"),
            name: name.to_string(),
            email: format!("{}@company.com", name.to_lowercase().replace(' ', ".")),
            avatar_ref: None,
        }
    }

    struct CountingDirectory {
        inner: InMemoryEmployeeDirectory,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl EmployeeDirectory for CountingDirectory {
        async fn employees_by_ids(&self, ids: &[u64]) -> Result<Vec<EmployeeProfile>> {
            self.lookups.fetch_add(ids.len(), Ordering::SeqCst);
            self.inner.employees_by_ids(ids).await
        }

        async fn managed_employee_ids(&self, hr_user_id: u64) -> Result<BTreeSet<u64>> {
            self.inner.managed_employee_ids(hr_user_id).await
        }
    }

    #[actix_web::test]
    async fn in_memory_scope_follows_manager() {
        let dir = InMemoryEmployeeDirectory::new()
            .with_employee(profile(1, "Jane Doe"), 100)
            .with_employee(profile(2, "John Roe"), 100)
            .with_employee(profile(3, "Ann Poe"), 200);

        assert_eq!(
            dir.managed_employee_ids(100).await.unwrap(),
            BTreeSet::from([1, 2])
        );
        assert!(dir.managed_employee_ids(999).await.unwrap().is_empty());

        let found = dir.employees_by_ids(&[3, 42]).await.unwrap();
        assert_eq!(found, vec![profile(3, "Ann Poe")]);
    }

    #[actix_web::test]
    async fn cache_only_asks_for_misses() {
        let counting = CountingDirectory {
            inner: InMemoryEmployeeDirectory::new()
                .with_employee(profile(1, "Jane Doe"), 100)
                .with_employee(profile(2, "John Roe"), 100),
            lookups: AtomicUsize::new(0),
        };
        let cached = CachedEmployeeDirectory::new(counting, Duration::from_secs(60));

        assert_eq!(cached.employees_by_ids(&[1]).await.unwrap().len(), 1);
        assert_eq!(cached.employees_by_ids(&[1, 2]).await.unwrap().len(), 2);
        assert_eq!(cached.inner.lookups.load(Ordering::SeqCst), 2);
    }
}
