use anyhow::Result;

use crate::services::AppServices;

pub async fn execute(services: &AppServices) -> Result<()> {
    let report = services.health();
    match report.message {
        Some(ref message) => println!("Configuration: {} ({})", report.status, message),
        None => println!("Configuration: {}", report.status),
    }

    match services.auth_check().await {
        Ok(message) => {
            println!("Credentials: ok ({})", message);
            Ok(())
        }
        Err(e) => {
            println!("Credentials: error ({})", e);
            anyhow::bail!("credential check failed")
        }
    }
}
