pub mod kv;
pub mod proposals;

pub use kv::*;
pub use proposals::*;
