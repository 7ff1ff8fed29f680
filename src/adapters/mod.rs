pub mod http;
pub mod persistence;
pub mod websocket;
