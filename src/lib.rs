pub mod bridge;
pub mod demo;
pub mod enumerate;
pub mod error;
pub mod model;
pub mod paths;
pub mod python;
pub mod registry;
pub mod response;
#[cfg(feature = "server")]
pub mod server;
pub mod settings;
pub mod state;
pub mod world;
