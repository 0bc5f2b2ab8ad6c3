pub mod auth;
pub mod credentials;
pub mod enrollments;
pub mod error;
pub mod events;
pub mod guard;
pub mod identity;
pub mod media;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod users;
pub mod validate;
