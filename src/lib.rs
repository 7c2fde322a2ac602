pub mod api_router;
pub mod chat;
pub mod config;
pub mod directory;
pub mod project;
pub mod session;
pub mod shared;
pub mod tasks;
