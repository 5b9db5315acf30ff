use crate::auth::AuthConfig;
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::upflow;
use crate::upflow::email::{EmailSender, LogEmailSender};
use anyhow::{Context, Result};
use std::sync::Arc;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port, dsn } => {
            // Reject an unparsable public origin before binding anything.
            Url::parse(&globals.public_url)
                .with_context(|| format!("invalid public URL: {}", globals.public_url))?;

            let config = AuthConfig::new(globals.public_url.clone(), globals.auth_secret.clone());

            let email: Arc<dyn EmailSender> = Arc::new(LogEmailSender);

            upflow::new(port, dsn, config, email).await?;
        }
    }

    Ok(())
}
