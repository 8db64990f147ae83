pub mod auth;
pub mod comics;
pub mod detail;
pub mod genres;
pub mod home;
pub mod search;
pub mod user;
