pub mod links;

pub mod logger;
