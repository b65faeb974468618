//! Módulo de base de datos
//!
//! Manejo de la conexión a PostgreSQL

pub mod connection;

pub use connection::DatabaseConnection;
