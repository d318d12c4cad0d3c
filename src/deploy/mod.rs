//! Task-driven publishing of static sites.
//!
//! | Module       | Responsibility                                              |
//! |--------------|-------------------------------------------------------------|
//! | `models`     | Wire types of the task endpoint and the callback payload    |
//! | `bundle`     | Attachment decoding and the merged file bundle              |
//! | `templates`  | Fallback pages chosen from the brief                        |
//! | `generator`  | Optional chat-completion generation of the app files        |
//! | `scaffold`   | LICENSE, README, Pages workflow and `.gitignore`            |
//! | `github`     | Repository provider REST client                             |
//! | `committer`  | Ordered, version-checked writes of scaffold and bundle      |
//! | `poller`     | Waits for the published site to answer                      |
//! | `notifier`   | Evaluation callback with capped exponential retries         |
//! | `pipeline`   | One publish run from request to response                    |
//! | `api`        | HTTP handlers and error mapping                             |
//! | `server`     | Router assembly and the listening loop                      |

pub mod api;
pub mod bundle;
pub mod committer;
pub mod generator;
pub mod github;
pub mod models;
pub mod notifier;
pub mod pipeline;
pub mod poller;
pub mod scaffold;
pub mod server;
pub mod templates;

#[cfg(test)]
pub(crate) mod test_support;
