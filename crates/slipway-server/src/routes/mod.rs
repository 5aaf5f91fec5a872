pub mod events;
pub mod health;
pub mod stack;
pub mod units;
