mod jwt_auth;

pub use jwt_auth::{admin_middleware, jwt_auth_middleware};
