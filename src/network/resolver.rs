use std::time::Duration;

use crate::error::{ErrorWrap, FabricNetError, FabricNetResult};
use crate::exec;

/// Resolves the human readable name of a network from its ID.
pub trait NameResolver: Send + Sync {
    fn network_name(&self, network_id: &str) -> FabricNetResult<String>;
}

/// Ask the container engine for the network name.
pub struct DockerResolver {
    binary: String,
    timeout: Duration,
}

impl DockerResolver {
    pub fn new(binary: &str, timeout: Duration) -> Self {
        DockerResolver {
            binary: binary.to_string(),
            timeout,
        }
    }
}

impl NameResolver for DockerResolver {
    fn network_name(&self, network_id: &str) -> FabricNetResult<String> {
        let out = exec::run(
            &self.binary,
            &["network", "inspect", "--format", "{{.Name}}", network_id],
            self.timeout,
        )
        .wrap(format!("resolve name of network {}", network_id))?;

        let name = out.trim();
        if name.is_empty() {
            return Err(FabricNetError::msg(format!(
                "network {} has an empty name",
                network_id
            )));
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_resolver_output() {
        // echo stands in for the engine binary and prints its arguments back
        let resolver = DockerResolver::new("echo", exec::DEFAULT_COMMAND_TIMEOUT);
        let name = resolver.network_name("abc").unwrap();
        assert_eq!(name, "network inspect --format {{.Name}} abc");
    }

    #[test]
    fn test_docker_resolver_failure() {
        let resolver = DockerResolver::new("false", exec::DEFAULT_COMMAND_TIMEOUT);
        let err = resolver.network_name("abc").unwrap_err();
        assert!(matches!(err.unwrap(), FabricNetError::CommandFailed { .. }));
        assert!(err.to_string().starts_with("resolve name of network abc"));
    }
}
