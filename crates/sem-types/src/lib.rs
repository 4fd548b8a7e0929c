pub mod errors;
pub mod format;
pub mod series;

pub use errors::*;
pub use format::*;
pub use series::*;
