mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
}
pub mod config;
mod constants;
pub mod error;
pub mod media;
pub mod routes;
pub mod state;

pub use authentication::*;
pub use constants::*;
pub use database::{actions, form, schema};
