//! # Fabric Wallet CLI
//!
//! Command-line tool for wallet provisioning:
//! - Enroll the CA admin into the wallet
//! - Register and enroll a user under the admin's authority
//! - Import an existing certificate/key pair
//! - List and inspect stored identities
//!
//! ## Usage
//!
//! ```bash
//! # Bootstrap the admin identity
//! wallet-client enroll-admin
//!
//! # Register and enroll a user
//! wallet-client register-user --user userHsc
//!
//! # Import a certificate and key produced elsewhere
//! wallet-client add-to-wallet --label admin --cert cert.pem --key key.pem
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use shared::{
    config::ClientConfig,
    constants::{DEFAULT_AFFILIATION, DEFAULT_USER_ROLE},
    error::WalletError,
    profile::ConnectionProfile,
    types::RegistrationRequest,
};
use wallet_client::{
    CredentialStore, FabricCaClient, FileSystemWallet, IdentityProvisioner, ProvisionOutcome,
    Registrar,
};

#[derive(Parser)]
#[command(name = "wallet-client")]
#[command(about = "Hyperledger Fabric wallet provisioning")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Wallet directory
    #[arg(long, global = true)]
    wallet: Option<PathBuf>,

    /// Connection profile
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    /// MSP ID of provisioned identities
    #[arg(long, global = true)]
    msp_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll the CA admin and store it in the wallet
    EnrollAdmin,

    /// Register a user with the CA and store its enrollment
    RegisterUser {
        /// Enrollment ID, also the wallet label
        #[arg(long, short = 'u')]
        user: String,

        /// Affiliation at the CA
        #[arg(long, default_value = DEFAULT_AFFILIATION)]
        affiliation: String,

        /// Identity type at the CA
        #[arg(long, default_value = DEFAULT_USER_ROLE)]
        role: String,

        /// Wallet label of the registrar (defaults to the admin)
        #[arg(long)]
        admin: Option<String>,
    },

    /// Import a PEM certificate and private key
    AddToWallet {
        /// Wallet label
        #[arg(long, short = 'l')]
        label: String,

        /// Certificate PEM file
        #[arg(long)]
        cert: PathBuf,

        /// Private key PEM file
        #[arg(long)]
        key: PathBuf,
    },

    /// List wallet labels
    List,

    /// Show a stored identity (the private key is never printed)
    Show {
        #[arg(long, short = 'l')]
        label: String,
    },
}

#[tokio::main]
async fn main() {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("\n✗ {:#}", e);
        if let Some(WalletError::PartialProvisioning { label, .. }) = e.downcast_ref::<WalletError>() {
            eprintln!("  '{}' exists at the CA but is missing from the wallet.", label);
            eprintln!("  Fix the wallet directory and re-enroll the identity.");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(path) = cli.wallet {
        config.wallet.path = path;
    }
    if let Some(path) = cli.profile {
        config.profile_path = path;
    }
    if let Some(msp_id) = cli.msp_id {
        config.msp_id = msp_id;
    }
    config.validate()?;

    match cli.command {
        Commands::EnrollAdmin => enroll_admin(&config).await,
        Commands::RegisterUser {
            user,
            affiliation,
            role,
            admin,
        } => {
            let request = RegistrationRequest::new(user)
                .with_affiliation(affiliation)
                .with_role(role);
            let admin = admin.unwrap_or_else(|| config.admin.enrollment_id.clone());
            register_user(&config, &request, &admin).await
        }
        Commands::AddToWallet { label, cert, key } => add_to_wallet(&config, &label, &cert, &key).await,
        Commands::List => list(&config).await,
        Commands::Show { label } => show(&config, &label).await,
    }
}

async fn open_wallet(config: &ClientConfig) -> Result<Arc<dyn CredentialStore>> {
    let wallet = FileSystemWallet::new(&config.wallet)
        .await
        .with_context(|| format!("cannot open wallet at {}", config.wallet.path.display()))?;
    info!(path = %wallet.path().display(), "Wallet opened");
    Ok(Arc::new(wallet))
}

async fn registrar(config: &ClientConfig) -> Result<Registrar> {
    let profile = ConnectionProfile::from_file(&config.profile_path)?;
    let ca = FabricCaClient::from_profile(&profile, &config.ca)?;
    let wallet = open_wallet(config).await?;

    Ok(Registrar::new(
        IdentityProvisioner::new(wallet),
        Arc::new(ca),
        config.msp_id.clone(),
    ))
}

async fn enroll_admin(config: &ClientConfig) -> Result<()> {
    let registrar = registrar(config).await?;

    match registrar.enroll_admin(&config.admin).await? {
        ProvisionOutcome::AlreadyPresent(label) => {
            println!("An identity for the admin user \"{}\" already exists in the wallet", label);
        }
        ProvisionOutcome::Provisioned(identity) => {
            println!("\n✓ Enrolled admin \"{}\" and imported it into the wallet", identity.label());
            println!("  MSP ID: {}", identity.msp_id());
        }
    }
    Ok(())
}

async fn register_user(config: &ClientConfig, request: &RegistrationRequest, admin: &str) -> Result<()> {
    let registrar = registrar(config).await?;

    match registrar.register_user(request, admin).await? {
        ProvisionOutcome::AlreadyPresent(label) => {
            println!("An identity for the user \"{}\" already exists in the wallet", label);
        }
        ProvisionOutcome::Provisioned(identity) => {
            println!(
                "\n✓ Registered and enrolled user \"{}\" and imported it into the wallet",
                identity.label()
            );
            println!("  Affiliation: {}", request.affiliation);
            println!("  Role: {}", request.role);
        }
    }
    Ok(())
}

async fn add_to_wallet(config: &ClientConfig, label: &str, cert: &Path, key: &Path) -> Result<()> {
    let provisioner = IdentityProvisioner::new(open_wallet(config).await?);

    if provisioner.store().exists(label).await? {
        println!("An identity for \"{}\" already exists in the wallet", label);
        return Ok(());
    }

    match provisioner
        .provision_from_files(label, &config.msp_id, cert, key)
        .await
    {
        Ok(identity) => {
            println!("\n✓ Imported \"{}\" into the wallet", identity.label());
            println!("  MSP ID: {}", identity.msp_id());
            Ok(())
        }
        Err(WalletError::AlreadyExists(_)) => {
            println!("An identity for \"{}\" already exists in the wallet", label);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn list(config: &ClientConfig) -> Result<()> {
    let wallet = open_wallet(config).await?;
    let labels = wallet.list().await?;

    if labels.is_empty() {
        println!("\nWallet is empty.");
        println!("Run 'wallet-client enroll-admin' to bootstrap the admin identity.");
        return Ok(());
    }

    println!("\nWallet identities:");
    for label in labels {
        println!("  {}", label);
    }
    Ok(())
}

async fn show(config: &ClientConfig, label: &str) -> Result<()> {
    let wallet = open_wallet(config).await?;
    let identity = wallet.get(label).await?;

    println!("\nIdentity:");
    println!("  Label: {}", identity.label());
    println!("  MSP ID: {}", identity.msp_id());
    println!("  Certificate:\n{}", identity.certificate());
    Ok(())
}
