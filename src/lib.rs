pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod governor;
pub mod platform;
pub mod state;
pub mod target;
mod test;
pub mod tunables;
pub mod utils;

pub mod prelude;
