pub mod admin;
pub mod catalog;
pub mod cdn;
pub mod chapters;
pub mod error;
pub mod pagination;
pub mod repos;
pub mod showcase;
pub mod views;
