use thiserror::Error;

/// User-Agent sent on every outgoing request. GitHub rejects requests without one.
pub const USER_AGENT: &str = "pr-reviewer";

#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("HTTP client unavailable: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Build the shared HTTP client used for both GitHub and the AI backends.
///
/// Fails only when the TLS backend cannot be initialised.
pub fn build_client() -> Result<reqwest::Client, DependencyError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client() {
        assert!(build_client().is_ok());
    }
}
