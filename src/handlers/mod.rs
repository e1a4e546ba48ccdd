// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer token resolved by the auth gate)

pub mod protected;
pub mod public;
