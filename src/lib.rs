pub mod adapter;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod http;
pub mod output;
pub mod transport;
