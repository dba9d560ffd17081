// Library root: exposes the server's modules so integration tests can drive
// the app loop and the WebSocket server directly.

pub mod app;
pub mod config;
pub mod protocol;
pub mod seed;
pub mod ws_server;
