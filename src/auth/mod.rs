// Authentication module
// Password hashing, JWT issuance, role checks, and the login/register/whoami handlers

pub mod access_control;
pub mod handlers;
pub mod memory;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use access_control::RoleName;
pub use handlers::{handle_get_user, handle_login, handle_register};
pub use middleware::{AuthenticatedUser, RequireRole};
pub use models::{AuthResponse, LoginRequest, RegisterRequest, Role, User, UserResponse};
pub use service::{AuthDependencies, AuthService};
