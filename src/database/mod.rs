pub mod maintenance;
pub mod product;
pub mod session;
pub mod sqlite_repository;
pub mod user;
