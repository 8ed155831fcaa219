pub mod auth;
pub mod bluetooth;
pub mod logging;
pub mod storage;
