pub mod challenge;
pub mod segment;
pub mod user;
