pub mod api;
pub mod generate;
pub mod sessions;
pub mod voices;
