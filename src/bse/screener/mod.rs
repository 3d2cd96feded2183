pub mod collect;
pub mod config;
pub mod error;
pub mod flatten;
pub mod io;
pub mod model;
pub mod screen;
pub mod sync;

pub use error::{Result, ScreenerError};
