pub mod interface;

pub mod manager;

pub mod store;
