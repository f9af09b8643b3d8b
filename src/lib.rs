pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod fade;
pub mod headless;
pub mod loader;
pub mod surface;
pub mod testkit;
pub mod tasks {
    pub mod controller;
    pub mod input;
}
