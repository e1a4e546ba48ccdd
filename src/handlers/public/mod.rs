// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Account creation, token acquisition and avatar serving. Nothing here
// receives an authenticated user.

pub mod users;
