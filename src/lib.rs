pub mod config;
pub mod engine;
pub mod json;
pub mod model;
pub mod window;

pub use config::Config;
pub use engine::Engine;
pub use model::{Account, AccountState, ExternalEvent, Transaction, Violation};
pub use window::TransactionWindow;
