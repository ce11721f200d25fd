//! Application services layer.

pub mod discuss;
pub mod error;
pub mod pagination;
pub mod render;
pub mod repos;
pub mod users;
