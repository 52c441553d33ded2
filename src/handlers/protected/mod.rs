pub mod auth;
pub mod notes;
pub mod projects;
pub mod settings;
pub mod tasks;
pub mod users;
pub mod utils;
