mod money;
mod secret;

pub mod helpers;

pub use money::{Money, MoneyParseError};
pub use secret::Secret;
