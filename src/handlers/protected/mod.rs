// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route in this tier runs behind `jwt_auth_middleware`, which puts an
// `AuthUser` in the request extensions. Handlers pass `auth.user` down to the
// services, which scope every read and write to that identity.

pub mod tasks;
pub mod users;
