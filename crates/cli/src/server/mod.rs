pub mod control;

pub use control::{spawn_shutdown_listener, ControlLoop};
