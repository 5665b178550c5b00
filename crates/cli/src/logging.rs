//! Process logging setup.
//!
//! Logging is owned by a [`LoggingHandle`] created in `main` and scoped through a default
//! subscriber guard, so nothing is installed globally.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Directive applied on top of `RUST_LOG`.
pub const DEFAULT_DIRECTIVE: &str = "rehab=info";

/// Active logging configuration. Events are written to stderr until the handle is shut down.
pub struct LoggingHandle {
    guard: DefaultGuard,
}

impl LoggingHandle {
    /// Installs a `registry + EnvFilter + fmt` subscriber for the current thread.
    pub fn init() -> anyhow::Result<Self> {
        let filter = EnvFilter::from_default_env().add_directive(DEFAULT_DIRECTIVE.parse()?);
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

        Ok(Self {
            guard: tracing::subscriber::set_default(subscriber),
        })
    }

    /// Removes the subscriber. Events emitted afterwards are dropped.
    pub fn shutdown(self) {
        tracing::debug!("logging shut down");
        drop(self.guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_parses() {
        assert!(DEFAULT_DIRECTIVE
            .parse::<tracing_subscriber::filter::Directive>()
            .is_ok());
    }

    #[test]
    fn handle_scopes_the_subscriber() {
        let handle = LoggingHandle::init().expect("init");
        assert!(tracing::enabled!(tracing::Level::INFO));
        handle.shutdown();
    }
}
