use std::env;
use std::str::FromStr;

/// Which repository implementations the composition root wires in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RepositoryBackend {
    #[default]
    Postgres,
    /// Process-local storage, for demos and tests
    Memory,
}

impl FromStr for RepositoryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown repository backend '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backend: RepositoryBackend,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        let backend = env::var("REPOSITORY_BACKEND")
            .ok()
            .and_then(|b| b.parse().ok())
            .unwrap_or_default();

        Self {
            host,
            port,
            backend,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            backend: RepositoryBackend::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("memory".parse(), Ok(RepositoryBackend::Memory));
        assert_eq!("Postgres".parse(), Ok(RepositoryBackend::Postgres));
        assert!("sqlite".parse::<RepositoryBackend>().is_err());
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(ServerConfig::default().bind_address(), "0.0.0.0:3000");
    }
}
