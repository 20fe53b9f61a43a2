pub mod health;
pub mod product;
pub mod session;
pub mod user;
