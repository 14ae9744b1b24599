//! Registers a small service graph, resolves it, then swaps one service
//! in a fork.
//!
//! Run with `RUST_LOG=stratum_container=debug` to see the container logs.

use std::sync::Arc;

use stratum::prelude::*;
use tracing_subscriber::EnvFilter;

trait Mailer: Send + Sync {
    fn send(&self, to: &str, body: &str) -> String;
}

#[derive(Injectable)]
struct SmtpMailer;

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, body: &str) -> String {
        format!("smtp -> {to}: {body}")
    }
}

impl From<SmtpMailer> for Arc<dyn Mailer> {
    fn from(mailer: SmtpMailer) -> Self {
        Arc::new(mailer)
    }
}

#[derive(Injectable)]
struct OutboxMailer;

impl Mailer for OutboxMailer {
    fn send(&self, to: &str, body: &str) -> String {
        format!("queued for {to}: {body}")
    }
}

impl From<OutboxMailer> for Arc<dyn Mailer> {
    fn from(mailer: OutboxMailer) -> Self {
        Arc::new(mailer)
    }
}

#[derive(Injectable)]
struct SignupService {
    mailer: Arc<dyn Mailer>,
    #[injectable(default)]
    greeting: String,
}

impl SignupService {
    fn signup(&self, user: &str) -> String {
        let greeting = if self.greeting.is_empty() { "Welcome" } else { &self.greeting };
        self.mailer.send(user, greeting)
    }
}

fn main() -> stratum::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let container = Container::builder()
        .register::<Arc<dyn Mailer>, SmtpMailer>(Lifetime::Singleton)
        .register::<Arc<SignupService>, SignupService>(Lifetime::Transient)
        .build()?;

    let service: Arc<SignupService> = container.resolve()?;
    println!("{}", service.signup("ada@example.com"));

    let testing = container.customize();
    testing.register::<Arc<dyn Mailer>, OutboxMailer>(Lifetime::Singleton)?;

    let service: Arc<SignupService> = testing.resolve()?;
    println!("{}", service.signup("grace@example.com"));

    println!("{container:?}");
    println!("{testing:?}");
    Ok(())
}
