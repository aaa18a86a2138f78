mod handler;
pub mod model;

pub use handler::{obtain_token, refresh_token, register};
