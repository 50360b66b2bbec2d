//! HTTP handlers for the data endpoint.

pub mod db;
pub use db::*;
