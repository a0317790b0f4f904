pub mod customer;
pub mod database;
