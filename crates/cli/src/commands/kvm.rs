//! Key value map commands

use crate::config::EdgeConfig;
use crate::output::print_success;
use anyhow::{Context, Result};
use edgeci_lib::gateway::GatewayClient;

/// Print a key value map entry as JSON
pub async fn get_entry(config: &EdgeConfig, org: &str, env: &str, map: &str, key: &str) -> Result<()> {
    let client = config.client()?;
    let entry = client
        .fetch_kvm_entry(org, env, map, key)
        .await
        .with_context(|| format!("Failed to read {} from map {}", key, map))?;

    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

/// Insert a key value map entry
pub async fn insert_entry(
    config: &EdgeConfig,
    org: &str,
    env: &str,
    map: &str,
    key: &str,
    value: &str,
) -> Result<()> {
    let client = config.client()?;
    client
        .insert_kvm_entry(org, env, map, key, value)
        .await
        .with_context(|| format!("Failed to insert {} into map {}", key, map))?;

    print_success(&format!("Inserted {} into {} ({})", key, map, env));
    Ok(())
}
