mod server;

pub use server::{ServerConfig, load_or_create_secret};
