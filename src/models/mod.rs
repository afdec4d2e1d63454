pub mod error;
pub mod job;
pub mod notification;
pub mod workflow;
