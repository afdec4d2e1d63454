pub mod api;
pub mod poller;
pub mod workflow;
