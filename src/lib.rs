//! Operation-execution governance for a database client.
//!
//! Every outgoing operation passes three gates before it is sent:
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                  OPERATION GOVERNOR                       │
//!                 │                                                           │
//!  Client call    │  ┌───────────┐    ┌─────────────────┐    ┌─────────────┐  │
//!  ───────────────┼─▶│  limiter  │───▶│     context     │───▶│ preference  │──┼──▶ dispatch
//!                 │  │  admit?   │    │ deadline/cancel │    │  resolver   │  │
//!                 │  └───────────┘    └─────────────────┘    └─────────────┘  │
//!                 │                                                           │
//!                 │  ┌─────────────────────────────────────────────────────┐  │
//!                 │  │              Cross-Cutting Concerns                  │  │
//!                 │  │      ┌─────────┐          ┌───────────────┐          │  │
//!                 │  │      │ config  │          │ observability │          │  │
//!                 │  │      └─────────┘          └───────────────┘          │  │
//!                 │  └─────────────────────────────────────────────────────┘  │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod context;
pub mod dispatch;
pub mod limiter;
pub mod observability;
pub mod preference;

pub use config::GovernanceConfig;
pub use context::{OperationContext, Timeout};
pub use dispatch::OperationGovernor;
pub use limiter::TokenBucket;
pub use preference::{resolve_read_preference, ReadPreference};
