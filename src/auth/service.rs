// Authentication service - business logic layer

use std::sync::Arc;

use tracing::{debug, info, warn};
use validator::Validate;

use crate::auth::{
    access_control::RoleName,
    models::{AuthResponse, LoginRequest, NewUser, RegisterRequest, Role, User, UserResponse},
    password::PasswordHasher,
    repository::{RoleStore, UserStore},
    token::{Identity, TokenService},
};
use crate::error::{ApiError, StoreError};

/// Collaborators the authentication service is built from
#[derive(Clone)]
pub struct AuthDependencies {
    pub user_store: Arc<dyn UserStore>,
    pub role_store: Arc<dyn RoleStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenService>,
    /// Work factor passed to the hasher on registration
    pub salt_rounds: u32,
}

/// Login, registration and current-user lookup.
/// Holds no per-request state; every call goes through the injected stores.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
    salt_rounds: u32,
}

impl AuthService {
    pub fn new(deps: AuthDependencies) -> Self {
        Self {
            users: deps.user_store,
            roles: deps.role_store,
            hasher: deps.hasher,
            tokens: deps.tokens,
            salt_rounds: deps.salt_rounds,
        }
    }

    /// Verify credentials and issue an access token.
    /// Unknown email and wrong password are reported as different errors.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        debug!("Login attempt for {}", request.email);

        let found = self
            .users
            .find_by_email_with_role(&request.email)
            .await?
            .ok_or_else(|| ApiError::EmailNotRegistered {
                email: request.email.clone(),
            })?;

        if !self
            .verify_password(&request.password, &found.user.encrypted_password)
            .await?
        {
            warn!("Wrong password for user_id={}", found.user.id);
            return Err(ApiError::WrongPassword);
        }

        let access_token = self.issue_token(&found.user, &found.role)?;
        info!("User logged in: user_id={}", found.user.id);
        Ok(AuthResponse { access_token })
    }

    /// Create a CUSTOMER account and issue an access token.
    /// Failures outside the error taxonomy are reported as 422.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.try_register(request)
            .await
            .map_err(ApiError::into_unprocessable)
    }

    async fn try_register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        request.validate()?;

        if self.users.find_by_email(&request.email).await?.is_some() {
            debug!("Registration rejected, email taken: {}", request.email);
            return Err(ApiError::EmailAlreadyTaken {
                email: request.email.clone(),
            });
        }

        let role = self
            .roles
            .find_by_name(RoleName::DEFAULT.as_str())
            .await?
            .ok_or_else(|| {
                ApiError::Internal(format!("Role {} is not seeded", RoleName::DEFAULT))
            })?;

        let encrypted_password = self.hash_password(&request.password).await?;

        let user = self
            .users
            .create(NewUser {
                name: request.name.clone(),
                email: request.email.clone(),
                encrypted_password,
                role_id: role.id,
            })
            .await
            .map_err(|e| match e {
                // lost a race with a concurrent registration for the same email
                StoreError::UniqueViolation(_) => ApiError::EmailAlreadyTaken {
                    email: request.email.clone(),
                },
                other => ApiError::Store(other),
            })?;

        let access_token = self.issue_token(&user, &role)?;
        info!("User registered: user_id={}", user.id);
        Ok(AuthResponse { access_token })
    }

    /// Current user with its role, looked up by the authenticated id
    pub async fn get_user(&self, user_id: i32) -> Result<UserResponse, ApiError> {
        let user = self
            .users
            .find_by_pk(user_id)
            .await?
            .ok_or_else(|| ApiError::RecordNotFound {
                resource: "User".to_string(),
            })?;

        let role = self
            .roles
            .find_by_pk(user.role_id)
            .await?
            .ok_or_else(|| ApiError::RecordNotFound {
                resource: "Role".to_string(),
            })?;

        Ok(UserResponse::new(user, &role))
    }

    // bcrypt is CPU-bound; both calls run on the blocking pool

    async fn verify_password(&self, plaintext: &str, hash: &str) -> Result<bool, ApiError> {
        let hasher = Arc::clone(&self.hasher);
        let (plaintext, hash) = (plaintext.to_string(), hash.to_string());

        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
            .await
            .map_err(|e| ApiError::Internal(format!("Password verification task failed: {}", e)))?
    }

    async fn hash_password(&self, plaintext: &str) -> Result<String, ApiError> {
        let hasher = Arc::clone(&self.hasher);
        let plaintext = plaintext.to_string();
        let rounds = self.salt_rounds;

        tokio::task::spawn_blocking(move || hasher.hash(&plaintext, rounds))
            .await
            .map_err(|e| ApiError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    fn issue_token(&self, user: &User, role: &Role) -> Result<String, ApiError> {
        self.tokens.sign(&Identity::new(user, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryStore;
    use crate::auth::models::UserWithRole;
    use crate::auth::token::Claims;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ===== Fakes =====

    /// Prefixes the plaintext; records every call
    #[derive(Default)]
    struct RecordingHasher {
        hash_calls: Mutex<Vec<(String, u32)>>,
        verify_calls: AtomicUsize,
    }

    impl PasswordHasher for RecordingHasher {
        fn hash(&self, plaintext: &str, rounds: u32) -> Result<String, ApiError> {
            self.hash_calls
                .lock()
                .unwrap()
                .push((plaintext.to_string(), rounds));
            Ok(format!("hashed:{}", plaintext))
        }

        fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, ApiError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            Ok(hash == format!("hashed:{}", plaintext))
        }
    }

    /// Returns a fixed token and remembers the identities it signed
    #[derive(Default)]
    struct RecordingTokens {
        signed: Mutex<Vec<Identity>>,
    }

    impl TokenService for RecordingTokens {
        fn sign(&self, identity: &Identity) -> Result<String, ApiError> {
            self.signed.lock().unwrap().push(identity.clone());
            Ok("access_token".to_string())
        }

        fn verify(&self, _token: &str) -> Result<Claims, ApiError> {
            Err(ApiError::InvalidToken)
        }
    }

    /// Wraps the memory store and counts `create` calls
    struct CountingUsers {
        inner: Arc<MemoryStore>,
        creates: AtomicUsize,
    }

    #[async_trait]
    impl UserStore for CountingUsers {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.inner.find_by_email(email).await
        }

        async fn find_by_email_with_role(
            &self,
            email: &str,
        ) -> Result<Option<UserWithRole>, StoreError> {
            self.inner.find_by_email_with_role(email).await
        }

        async fn find_by_pk(&self, id: i32) -> Result<Option<User>, StoreError> {
            UserStore::find_by_pk(self.inner.as_ref(), id).await
        }

        async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create(new_user).await
        }
    }

    /// Every call fails like an unreachable database
    struct BrokenUsers;

    #[async_trait]
    impl UserStore for BrokenUsers {
        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
            Ok(None)
        }

        async fn find_by_email_with_role(
            &self,
            _email: &str,
        ) -> Result<Option<UserWithRole>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn find_by_pk(&self, _id: i32) -> Result<Option<User>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn create(&self, _new_user: NewUser) -> Result<User, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    struct Harness {
        service: AuthService,
        store: Arc<MemoryStore>,
        users: Arc<CountingUsers>,
        hasher: Arc<RecordingHasher>,
        tokens: Arc<RecordingTokens>,
    }

    fn harness_with(store: MemoryStore) -> Harness {
        let store = Arc::new(store);
        let users = Arc::new(CountingUsers {
            inner: Arc::clone(&store),
            creates: AtomicUsize::new(0),
        });
        let hasher = Arc::new(RecordingHasher::default());
        let tokens = Arc::new(RecordingTokens::default());

        let service = AuthService::new(AuthDependencies {
            user_store: users.clone(),
            role_store: store.clone(),
            hasher: hasher.clone(),
            tokens: tokens.clone(),
            salt_rounds: 10,
        });

        Harness {
            service,
            store,
            users,
            hasher,
            tokens,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryStore::with_default_roles())
    }

    async fn seed_user(store: &MemoryStore, email: &str, password: &str) -> User {
        store
            .create(NewUser {
                name: "Test User".to_string(),
                email: email.to_string(),
                encrypted_password: format!("hashed:{}", password),
                role_id: 2,
            })
            .await
            .unwrap()
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn register(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: "password".to_string(),
        }
    }

    // ===== Login =====

    #[tokio::test]
    async fn test_login_issues_token_for_stored_identity() {
        let h = harness();
        let user = seed_user(&h.store, "test@example.com", "password").await;

        let response = h
            .service
            .login(&login("test@example.com", "password"))
            .await
            .unwrap();

        assert_eq!(response.access_token, "access_token");
        let signed = h.tokens.signed.lock().unwrap();
        assert_eq!(signed.len(), 1);
        assert_eq!(
            signed[0],
            Identity {
                id: user.id,
                name: "Test User".to_string(),
                email: "test@example.com".to_string(),
                image: None,
                role: crate::auth::models::RoleSummary {
                    id: 2,
                    name: "CUSTOMER".to_string(),
                },
            }
        );
    }

    #[tokio::test]
    async fn test_login_unknown_email_skips_password_check() {
        let h = harness();

        let err = h
            .service
            .login(&login("ghost@example.com", "password"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::EmailNotRegistered { ref email } if email == "ghost@example.com"));
        assert_eq!(h.hasher.verify_calls.load(Ordering::SeqCst), 0);
        assert!(h.tokens.signed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_wrong_password_issues_no_token() {
        let h = harness();
        seed_user(&h.store, "test@example.com", "password").await;

        let err = h
            .service
            .login(&login("test@example.com", "wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::WrongPassword));
        assert_eq!(h.hasher.verify_calls.load(Ordering::SeqCst), 1);
        assert!(h.tokens.signed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_email_match_is_exact() {
        let h = harness();
        seed_user(&h.store, "test@example.com", "password").await;

        let err = h
            .service
            .login(&login("Test@Example.com", "password"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmailNotRegistered { .. }));
    }

    #[tokio::test]
    async fn test_login_store_failure_is_500() {
        let service = AuthService::new(AuthDependencies {
            user_store: Arc::new(BrokenUsers),
            role_store: Arc::new(MemoryStore::with_default_roles()),
            hasher: Arc::new(RecordingHasher::default()),
            tokens: Arc::new(RecordingTokens::default()),
            salt_rounds: 10,
        });

        let err = service
            .login(&login("test@example.com", "password"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    /// Records the thread each hasher call ran on
    #[derive(Default)]
    struct ThreadRecordingHasher {
        threads: Mutex<Vec<std::thread::ThreadId>>,
    }

    impl PasswordHasher for ThreadRecordingHasher {
        fn hash(&self, plaintext: &str, _rounds: u32) -> Result<String, ApiError> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            Ok(format!("hashed:{}", plaintext))
        }

        fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, ApiError> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            Ok(hash == format!("hashed:{}", plaintext))
        }
    }

    #[tokio::test]
    async fn test_password_work_runs_off_the_async_thread() {
        let hasher = Arc::new(ThreadRecordingHasher::default());
        let service = AuthService::new(AuthDependencies {
            user_store: Arc::new(MemoryStore::with_default_roles()),
            role_store: Arc::new(MemoryStore::with_default_roles()),
            hasher: hasher.clone(),
            tokens: Arc::new(RecordingTokens::default()),
            salt_rounds: 10,
        });

        service.register(&register("test@example.com")).await.unwrap();
        service
            .login(&login("test@example.com", "password"))
            .await
            .unwrap();

        let runtime_thread = std::thread::current().id();
        let threads = hasher.threads.lock().unwrap();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|id| *id != runtime_thread));
    }

    // ===== Register =====

    #[tokio::test]
    async fn test_register_hashes_before_storing() {
        let h = harness();

        let response = h.service.register(&register("new@example.com")).await.unwrap();
        assert_eq!(response.access_token, "access_token");

        assert_eq!(
            *h.hasher.hash_calls.lock().unwrap(),
            vec![("password".to_string(), 10)]
        );
        let stored = h.store.find_by_email("new@example.com").await.unwrap().unwrap();
        assert_eq!(stored.encrypted_password, "hashed:password");
        assert_ne!(stored.encrypted_password, "password");
        assert_eq!(stored.role_id, 2);
    }

    #[tokio::test]
    async fn test_register_signs_same_claim_shape_as_login() {
        let h = harness();

        h.service.register(&register("new@example.com")).await.unwrap();

        let signed = h.tokens.signed.lock().unwrap();
        assert_eq!(signed[0].email, "new@example.com");
        assert_eq!(signed[0].role.name, "CUSTOMER");
        assert_eq!(signed[0].role.id, 2);
        assert!(signed[0].image.is_none());
    }

    #[tokio::test]
    async fn test_register_existing_email_never_creates() {
        let h = harness();
        seed_user(&h.store, "taken@example.com", "password").await;

        let err = h
            .service
            .register(&register("taken@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::EmailAlreadyTaken { .. }));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(h.users.creates.load(Ordering::SeqCst), 0);
        assert!(h.hasher.hash_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_invalid_body_is_422_without_store_calls() {
        let h = harness();
        let mut request = register("not-an-email");
        request.name = "  ".to_string();

        let err = h.service.register(&request).await.unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(h.users.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_register_without_seeded_role_is_422() {
        let h = harness_with(MemoryStore::new());

        let err = h.service.register(&register("new@example.com")).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.details().is_none());
        assert_eq!(h.users.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_register_store_failure_is_422() {
        let service = AuthService::new(AuthDependencies {
            user_store: Arc::new(BrokenUsers),
            role_store: Arc::new(MemoryStore::with_default_roles()),
            hasher: Arc::new(RecordingHasher::default()),
            tokens: Arc::new(RecordingTokens::default()),
            salt_rounds: 10,
        });

        let err = service.register(&register("new@example.com")).await.unwrap_err();

        assert_eq!(err.name(), "StoreError");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_registration_creates_one_user() {
        let h = harness();
        let service = Arc::new(h.service);

        let a = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.register(&register("race@example.com")).await })
        };
        let b = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.register(&register("race@example.com")).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(ApiError::EmailAlreadyTaken { .. }))));
        assert_eq!(h.store.user_count().await, 1);
    }

    // ===== Current user =====

    #[tokio::test]
    async fn test_get_user_returns_record_with_role() {
        let h = harness();
        let user = seed_user(&h.store, "test@example.com", "password").await;

        let response = h.service.get_user(user.id).await.unwrap();

        assert_eq!(response.id, user.id);
        assert_eq!(response.email, "test@example.com");
        assert_eq!(response.role_id, 2);
        assert_eq!(response.role.name, "CUSTOMER");
    }

    #[tokio::test]
    async fn test_get_user_missing_id_is_record_not_found() {
        let h = harness();

        let err = h.service.get_user(404).await.unwrap_err();

        assert!(matches!(err, ApiError::RecordNotFound { ref resource } if resource == "User"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(h.tokens.signed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_user_with_dangling_role_is_record_not_found() {
        let h = harness_with(MemoryStore::new());
        h.store
            .insert_role(Role {
                id: 9,
                name: "CUSTOMER".to_string(),
            })
            .await;
        let user = h
            .store
            .create(NewUser {
                name: "Orphan".to_string(),
                email: "orphan@example.com".to_string(),
                encrypted_password: "hashed:x".to_string(),
                role_id: 3,
            })
            .await
            .unwrap();

        let err = h.service.get_user(user.id).await.unwrap_err();
        assert!(matches!(err, ApiError::RecordNotFound { ref resource } if resource == "Role"));
    }

    #[tokio::test]
    async fn test_get_user_store_failure_is_500() {
        let service = AuthService::new(AuthDependencies {
            user_store: Arc::new(BrokenUsers),
            role_store: Arc::new(MemoryStore::with_default_roles()),
            hasher: Arc::new(RecordingHasher::default()),
            tokens: Arc::new(RecordingTokens::default()),
            salt_rounds: 10,
        });

        let err = service.get_user(1).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
