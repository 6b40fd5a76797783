pub mod bom;
pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use bom::*;
pub use self::config::*;
pub use error::*;
pub use logging::*;
pub use validation::*;
