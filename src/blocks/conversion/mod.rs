pub mod base;
pub mod types;
pub mod formula;
pub mod logic;

pub use base::ConversionBlock;
pub use types::{Conversion, TextRange};
