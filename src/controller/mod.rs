pub mod client;

pub use client::{AppStatus, ControllerClient, ControllerError};
