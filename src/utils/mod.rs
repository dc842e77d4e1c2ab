pub use cancel_token::*;
pub use core_pinner::*;

mod cancel_token;
mod core_pinner;
pub mod logger;
pub mod params_io;
