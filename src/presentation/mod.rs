pub mod alert;
pub mod app;
pub mod components;
pub mod screens;
pub mod theme;

pub use app::RemoteApp;
