//! `EnvironmentContextProvider` implementations without platform access.

use ipdr_contracts::{audit::EntryContext, certificate::EnvironmentDescription};

use crate::{hash::HASH_ALGORITHM, traits::EnvironmentContextProvider};

pub const SOFTWARE_NAME: &str = "IPDR-Intel+";

fn describe_host() -> EnvironmentDescription {
    EnvironmentDescription {
        system: format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH),
        software: SOFTWARE_NAME.to_string(),
        software_version: env!("CARGO_PKG_VERSION").to_string(),
        hash_algorithm: HASH_ALGORITHM.to_string(),
    }
}

/// Provider for headless use: entries carry no context.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerEnvironment;

impl EnvironmentContextProvider for ServerEnvironment {
    fn capture(&self) -> EntryContext {
        EntryContext::default()
    }

    fn describe(&self) -> EnvironmentDescription {
        describe_host()
    }
}

/// Provider that stamps the same context on every entry.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    context: EntryContext,
}

impl StaticEnvironment {
    pub fn new(context: EntryContext) -> Self {
        Self { context }
    }
}

impl EnvironmentContextProvider for StaticEnvironment {
    fn capture(&self) -> EntryContext {
        self.context.clone()
    }

    fn describe(&self) -> EnvironmentDescription {
        describe_host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_environment_captures_nothing() {
        let env = ServerEnvironment;
        assert_eq!(env.capture(), EntryContext::default());
        let description = env.describe();
        assert_eq!(description.software, SOFTWARE_NAME);
        assert_eq!(description.hash_algorithm, "SHA-256");
    }

    #[test]
    fn static_environment_repeats_its_context() {
        let env = StaticEnvironment::new(EntryContext {
            user_agent: Some("ipdr-intel-cli".to_string()),
            ..EntryContext::default()
        });
        assert_eq!(env.capture().user_agent.as_deref(), Some("ipdr-intel-cli"));
        assert_eq!(env.capture(), env.capture());
    }
}
