pub mod http_client;

pub mod interface;

pub mod render_client;
