use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::Config;
use crate::services::AppServices;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (overrides bind_address)
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides port)
    #[arg(short, long)]
    port: Option<u16>,
}

impl ServeArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref bind) = self.bind {
            config.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
    }
}

pub fn listen_addr(config: &Config) -> Result<SocketAddr> {
    let ip: IpAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.bind_address))?;
    Ok(SocketAddr::new(ip, config.port))
}

pub async fn execute(services: Arc<AppServices>) -> Result<()> {
    let addr = listen_addr(&services.config())?;
    crate::server::serve(services, addr).await?;
    Ok(())
}
