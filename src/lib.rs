// Chat client library - exposes all core modules for testing

pub mod app;
pub mod config;
pub mod gemini;
pub mod highlight;
pub mod markdown;
pub mod session;
pub mod store;
pub mod view;
