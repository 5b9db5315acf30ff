use secrecy::SecretString;

/// Startup configuration shared by every action.
///
/// The signing secret lives here and nowhere else; handlers receive it through
/// the [`crate::auth::AuthConfig`] built once in `actions::server`.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub auth_secret: SecretString,
    pub public_url: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(auth_secret: SecretString, public_url: String) -> Self {
        Self {
            auth_secret,
            public_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            SecretString::from("s3cret".to_string()),
            "https://app.upflow.dev".to_string(),
        );
        assert_eq!(args.auth_secret.expose_secret(), "s3cret");
        assert_eq!(args.public_url, "https://app.upflow.dev");
    }
}
