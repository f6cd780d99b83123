//! `trustlink ensure` - run the federation pipeline for one logical name.

use clap::Args;
use std::sync::Arc;
use trustlink_aws::{RelyingPartyProvisioner, SdkIamClient};
use trustlink_cache::{IdempotencyCache, InMemoryCache, RedisCache};
use trustlink_core::{FederationConfig, FederationOutcome};
use trustlink_entra::{GraphDirectoryClient, IdentityProviderProvisioner};
use trustlink_orchestrator::FederationOrchestrator;

use crate::error::CliResult;

/// Arguments for the ensure command
#[derive(Args, Debug)]
pub struct EnsureArgs {
    /// Logical federation name; also names the AWS SAML provider
    #[arg(long, default_value = "AWS-1")]
    pub name: String,

    /// Ordinal distinguishing role-specific applications in the entity id
    #[arg(long, default_value_t = 1)]
    pub role_ordinal: u32,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the ensure command
pub async fn execute(args: EnsureArgs) -> CliResult<()> {
    // Fails before any client is built, so a bad environment never touches a remote system.
    let config = Arc::new(FederationConfig::from_env()?);

    tracing::info!(
        name = %args.name,
        role_ordinal = args.role_ordinal,
        tenant_id = %config.tenant_id,
        aws_account_id = %config.aws_account_id,
        "Ensuring federation"
    );

    let cache = build_cache(&config)?;
    let directory = Arc::new(GraphDirectoryClient::from_config(&config)?);
    let iam = Arc::new(SdkIamClient::from_env().await);

    let orchestrator = FederationOrchestrator::new(
        config.clone(),
        IdentityProviderProvisioner::new(directory, config.clone()),
        RelyingPartyProvisioner::new(iam, config.clone()),
        cache,
    );

    let outcome = orchestrator
        .ensure_federation(&args.name, args.role_ordinal)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&args.name, &outcome);
    }
    Ok(())
}

fn build_cache(config: &FederationConfig) -> CliResult<Arc<dyn IdempotencyCache>> {
    match config.redis_url.as_deref() {
        Some(url) => {
            tracing::debug!(prefix = %config.cache_key_prefix, "Using Redis idempotency cache");
            Ok(Arc::new(RedisCache::connect(url, config.cache_key_prefix.clone())?))
        }
        None => {
            tracing::warn!("REDIS_URL not set, federation results will not outlive this process");
            Ok(Arc::new(InMemoryCache::new()))
        }
    }
}

fn print_outcome(name: &str, outcome: &FederationOutcome) {
    println!("Federation '{name}' is in place");
    println!("  App ID:            {}", outcome.app_id);
    println!("  Service principal: {}", outcome.identity.service_principal_id);
    println!("  SAML provider:     {}", outcome.trust_provider_arn);
    println!(
        "  Identity provider: {}",
        if outcome.cache_hit { "reused (cached)" } else { "provisioned" }
    );
    println!(
        "  Role:              {}",
        if outcome.role_created { "created" } else { "already present" }
    );
}
