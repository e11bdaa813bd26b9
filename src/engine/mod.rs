pub mod args;
pub mod error;
pub mod supervisor;

pub use args::build_engine_args;
pub use error::EngineError;
pub use supervisor::{EngineSupervisor, locate_binary};
