pub mod enums;
pub mod record;
pub mod verdict;

pub use enums::*;
pub use record::*;
pub use verdict::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
