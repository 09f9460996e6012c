pub mod controllers;
pub mod migrations;
pub mod models;

pub use controllers::user::UserController;
pub use migrations::Migrator;
