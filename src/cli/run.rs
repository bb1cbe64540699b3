use super::config::{default_config_path, PsiSumConfig};
use super::dataset::{load_identifiers, load_values};
use super::logging;
use psi_sum::crypto::RistrettoGroup;
use psi_sum::protocol::{run_over_channels, Coordinator, PartyA, PartyB};
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the protocol on the configured datasets
///
/// Both parties run in this process. B's output is printed; A's side of the
/// run has no output.
///
/// ## Configuration Loading
///
/// 1. `--config` flag if provided
/// 2. Default config at `~/.config/psi-sum/config.toml`
///
/// Unlike `init-config`, a missing file is an error here.
pub async fn execute(
    config_path: Option<String>,
    use_async: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let config = PsiSumConfig::load(&config_path)?;
    logging::init(&config.logging.level)?;

    let sum = compute(&config, &config_path, use_async).await?;
    println!("Intersection sum: {}", sum);

    Ok(())
}

/// Load both datasets, set up the parties and run one protocol instance
pub async fn compute(
    config: &PsiSumConfig,
    config_path: &Path,
    use_async: bool,
) -> Result<u128, Box<dyn std::error::Error>> {
    let identifiers = load_identifiers(&config.party_a, config_path)?;
    let values = load_values(&config.party_b, config_path)?;
    info!(
        identifiers = identifiers.len(),
        values = values.len(),
        modulus_bits = config.protocol.modulus_bits,
        "datasets loaded"
    );

    let protocol = config.protocol.clone();
    let group = RistrettoGroup::new(protocol.group_parameters()?);
    let cipher = protocol.cipher()?;

    // Paillier keygen in PartyB::new is CPU-bound
    let (party_a, party_b) = tokio::task::spawn_blocking(move || {
        let party_a = PartyA::new(identifiers, group.clone(), cipher, &protocol)?;
        let party_b = PartyB::new(values, group, cipher, &protocol)?;
        Ok::<_, psi_sum::protocol::ProtocolError>((party_a, party_b))
    })
    .await??;

    let sum = if use_async {
        run_over_channels(party_a, party_b).await?
    } else {
        tokio::task::spawn_blocking(move || Coordinator::new(party_a, party_b).run()).await??
    };

    Ok(sum)
}
