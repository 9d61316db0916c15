//! CLI command implementations.
//!
//! | Module    | Commands handled |
//! |-----------|------------------|
//! | `run`     | `Run`            |
//! | `extract` | `Extract`        |
//! | `config`  | `Config`         |

pub mod config;
pub mod extract;
pub mod run;

pub use config::cmd_config;
pub use extract::cmd_extract;
pub use run::cmd_run;
