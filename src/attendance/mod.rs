pub mod calendar;
pub mod controller;
pub mod engine;
pub mod memory;
pub mod query;
pub mod retry;
pub mod store;
pub mod summary;
