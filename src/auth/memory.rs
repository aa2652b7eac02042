// In-memory user and role store (development and tests)

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use crate::auth::access_control::RoleName;
use crate::auth::models::{NewUser, Role, User, UserWithRole};
use crate::auth::repository::{RoleStore, UserStore};
use crate::error::StoreError;

#[derive(Default)]
struct Tables {
    users: HashMap<i32, User>,
    roles: HashMap<i32, Role>,
    next_user_id: i32,
}

/// Store held entirely in process memory
/// Email uniqueness is checked and enforced under a single write lock
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with ADMIN (id 1) and CUSTOMER (id 2)
    pub fn with_default_roles() -> Self {
        let mut tables = Tables::default();
        for (id, name) in [(1, RoleName::Admin), (2, RoleName::Customer)] {
            tables.roles.insert(
                id,
                Role {
                    id,
                    name: name.to_string(),
                },
            );
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn insert_role(&self, role: Role) {
        self.tables.write().await.roles.insert(role.id, role);
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_email_with_role(
        &self,
        email: &str,
    ) -> Result<Option<UserWithRole>, StoreError> {
        let tables = self.tables.read().await;
        let joined = tables
            .users
            .values()
            .find(|u| u.email == email)
            .and_then(|user| {
                tables.roles.get(&user.role_id).map(|role| UserWithRole {
                    user: user.clone(),
                    role: role.clone(),
                })
            });
        Ok(joined)
    }

    async fn find_by_pk(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::UniqueViolation(format!(
                "users.email = {}",
                new_user.email
            )));
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.next_user_id,
            name: new_user.name,
            email: new_user.email,
            encrypted_password: new_user.encrypted_password,
            image: None,
            role_id: new_user.role_id,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        info!("User stored in memory: id={}", user.id);
        Ok(user)
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.roles.values().find(|r| r.name == name).cloned())
    }

    async fn find_by_pk(&self, id: i32) -> Result<Option<Role>, StoreError> {
        Ok(self.tables.read().await.roles.get(&id).cloned())
    }
}
