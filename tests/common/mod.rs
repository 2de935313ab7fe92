#![allow(dead_code)]

use russian_spin::config::{apply_overrides, RelayConfig, ENV_CONTRACT, ENV_PRIVATE_KEY, ENV_SUBMIT_TIMEOUT_MS};
use russian_spin::submission::{testing::RecordingChain, ChainRpc, SubmissionService};
use std::sync::Arc;

pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_SIGNER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const CONTRACT: &str = "0x336cc67C7A141d6d1711830EaDDC2147d3a33191";
pub const PLAYER: &str = "0x00000000000000000000000000000000000000aa";

/// Complete configuration with short step timeouts
pub fn relay_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    apply_overrides(&mut config, |name| match name {
        ENV_PRIVATE_KEY => Some(DEV_KEY.to_string()),
        ENV_CONTRACT => Some(CONTRACT.to_string()),
        ENV_SUBMIT_TIMEOUT_MS => Some("200".to_string()),
        _ => None,
    })
    .unwrap();
    config
}

/// Take the credentials out of `config` and start a service on `chain`.
pub async fn service_with(mut config: RelayConfig, chain: &Arc<RecordingChain>) -> SubmissionService {
    let credentials = config.take_credentials().unwrap();
    let rpc: Arc<dyn ChainRpc> = chain.clone();
    SubmissionService::with_chain(&config, credentials, rpc).await.unwrap()
}

pub async fn service_on(chain: &Arc<RecordingChain>) -> SubmissionService {
    service_with(relay_config(), chain).await
}
