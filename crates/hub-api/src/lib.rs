pub mod auth;
pub mod communities;
pub mod convert;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod posts;
pub mod router;
pub mod users;
