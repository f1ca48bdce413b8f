mod handlers;
mod models;
mod state;
mod thumbnail;

pub use handlers::run_server;
