pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod notify;
pub mod portal;
pub mod reconcile;
pub mod session;
pub mod sync;
