pub mod auth;
pub mod chat;
pub mod email;
pub mod error;
pub mod images;
pub mod posts;
pub mod relationship;
pub mod router;
pub mod session;
pub mod state;
pub mod users;

mod views;
