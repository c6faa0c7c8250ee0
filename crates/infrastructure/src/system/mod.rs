pub mod interface_enumerator;
pub mod resolv_file;

pub use interface_enumerator::SystemInterfaceEnumerator;
pub use resolv_file::{ResolvFileSource, StaticServerSource};
