pub mod import;
pub mod settings;
pub mod stats;
pub mod theses;
pub mod trades;

pub use import::*;
pub use settings::*;
pub use stats::*;
pub use theses::*;
pub use trades::*;
