pub mod data;
pub mod errors;
pub mod value;

pub use data::*; // Re-export common data types
pub use errors::*;
pub use value::*;
