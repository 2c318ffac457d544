//! CRUD boundary consumed by the provider framework.

pub mod handler;

pub use handler::ResourceHandler;
