pub mod balance;
pub mod description;

pub use balance::*;
pub use description::{decode_field, decode_fields, encode_description};
