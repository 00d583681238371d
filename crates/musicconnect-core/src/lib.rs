pub mod config;
pub mod generation;
pub mod prompts;
pub mod session;
pub mod share;

pub use config::*;
pub use generation::*;
pub use prompts::*;
pub use session::*;
pub use share::*;
