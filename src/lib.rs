pub mod buffer;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod meta;
pub mod navigation;
pub mod overlay;
pub mod sampling;
pub mod session;
pub mod visited;
pub mod tasks {
    pub mod files;
    pub mod loader;
    pub mod preloader;
    pub mod viewer;
}
