pub mod auth;
pub mod manifest;
pub mod setup;
pub mod tools;
