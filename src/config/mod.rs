//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GovernanceConfig (validated, immutable)
//!     → OperationGovernor::from_config
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → OperationGovernor::apply_config swaps reloadable settings
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Limiter capacity is fixed for the life of a governor; only timeouts and
//!   the default read preference reload

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::GovernanceConfig;
pub use schema::LimiterConfig;
pub use schema::ObservabilityConfig;
pub use schema::ReadPreferenceConfig;
pub use schema::TimeoutConfig;
