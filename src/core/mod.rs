pub mod cluster;
pub mod error;
pub mod paths;
pub mod poller;
pub mod terminal;
pub mod trigger;
