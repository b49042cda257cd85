pub mod import;
pub mod settings;
pub mod thesis;
pub mod trade;

pub use import::*;
pub use settings::*;
pub use thesis::*;
pub use trade::*;
