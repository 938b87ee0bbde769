use crate::config::BackendConfig;
use reqwest::RequestBuilder;
use std::fmt;

/// Basic-Auth credentials attached to every outbound backend request
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.username, &config.password)
    }

    /// Decorate an outbound request with the `Authorization` header
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sets_basic_auth_header() {
        let creds = Credentials::new("admin", "admin");
        let request = creds
            .apply(reqwest::Client::new().get("http://localhost/"))
            .build()
            .unwrap();
        let header = request.headers().get(reqwest::header::AUTHORIZATION).unwrap();
        assert_eq!(header.to_str().unwrap(), "Basic YWRtaW46YWRtaW4=");
        assert!(header.is_sensitive());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("reader", "hunter2");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("reader"));
        assert!(!printed.contains("hunter2"));
    }
}
