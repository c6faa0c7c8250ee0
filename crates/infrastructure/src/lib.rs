//! Ferrous Netd Infrastructure Layer
pub mod network;
pub mod system;
