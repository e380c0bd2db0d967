//! Compiles declarative alert checks into Flux scripts.

pub mod check;
pub mod compiler;
pub mod error;
pub mod flux;
pub mod settings;
pub mod storage;

pub use check::{Check, CheckLevel, Threshold, ThresholdConfig};
pub use compiler::{compile, compile_ast};
pub use error::CheckError;
pub use settings::ScriptSettings;
