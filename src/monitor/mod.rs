pub mod controller;
pub mod cooldown;
pub mod poller;
pub mod roundup;

pub use controller::{MonitorController, SessionParams};
pub use poller::PollerParams;
