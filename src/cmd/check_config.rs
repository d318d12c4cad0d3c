//! Configuration validation command: `pagesmith check-config`.

use pagesmith::config::DeployerConfig;
use pagesmith::deploy::github::is_valid_github_token;

pub fn cmd_check_config(config: &DeployerConfig) {
    println!();
    println!("Pagesmith Configuration");
    println!("=======================");
    println!();

    println!("[server]");
    println!("  bind_addr = \"{}\"", config.bind_addr);
    println!("  secret = <set>");
    println!();

    println!("[github]");
    println!("  owner = \"{}\"", config.github.owner);
    println!("  api_url = \"{}\"", config.github.api_url);
    println!("  pages_base = \"{}\"", config.github.pages_base());
    println!("  token = <set>");
    println!("  timeout_secs = {}", config.github.timeout.as_secs());
    println!();

    println!("[generation]");
    match &config.llm {
        Some(llm) => {
            println!("  url = \"{}\"", llm.base_url);
            println!("  model = \"{}\"", llm.model);
            println!("  auth = <set>");
        }
        None => println!("  disabled (template fallback only)"),
    }
    println!();

    let policy = &config.policy;
    println!("[policy]");
    println!("  reconcile_permissions = {}", policy.reconcile_permissions);
    println!("  on_notify_exhausted = \"{}\"", policy.on_notify_exhausted);
    println!("  pages_workflow = \"{}\"", policy.pages_workflow);
    println!("  commit_sha_source = \"{}\"", policy.commit_sha_source);
    println!("  include_gitignore = {}", policy.include_gitignore);
    println!();

    println!("[poll]");
    println!("  deadline_secs = {}", config.poll.deadline.as_secs());
    println!("  request_timeout_secs = {}", config.poll.request_timeout.as_secs());
    println!();

    println!("[notify]");
    println!("  max_attempts = {}", config.notify.max_attempts);
    println!("  request_timeout_secs = {}", config.notify.request_timeout.as_secs());
    println!();

    if !is_valid_github_token(&config.github.token) {
        println!("Warnings:");
        println!("  - GITHUB_TOKEN does not look like a GitHub token (expected a ghp_, gho_, ghs_, ghu_ or github_pat_ prefix)");
        println!();
    }

    println!("Configuration is valid.");
}
