pub mod actions;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod dbus;
pub mod error;
pub mod message;
pub mod navigation;
pub mod observer;
pub mod store;
