pub mod config;
pub mod event;
pub mod reactor;
pub mod runner;
pub mod watch;

pub use config::WatchConfig;
pub use event::{ChangeEvent, ChangeKind};
pub use reactor::{ChangeReactor, RunReport};
pub use runner::{CommandRunner, RunOutput, RunnerError, TestRunner};
pub use watch::{InterruptHandle, Signal, WatchError, WatchLoop};
