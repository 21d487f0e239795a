pub mod assignments;
pub mod files;
pub mod health;
