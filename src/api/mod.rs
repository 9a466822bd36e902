pub mod auth;
pub mod webhook;

pub use webhook::router;
