//! CLI command implementations.
//!
//! | Module          | Commands handled |
//! |-----------------|------------------|
//! | `serve`         | `Serve`          |
//! | `publish`       | `Publish`        |
//! | `check_config`  | `CheckConfig`    |

pub mod check_config;
pub mod publish;
pub mod serve;

pub use check_config::cmd_check_config;
pub use publish::cmd_publish;
pub use serve::cmd_serve;
