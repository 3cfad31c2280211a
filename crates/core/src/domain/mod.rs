pub mod catalog;
pub mod hero;
pub mod ranking;
pub mod roster;
