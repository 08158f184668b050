//! cryptpack - Password-derived encrypted directory backups
//!
//! Usage:
//!   cryptpack encrypt [--source <dir>] [--output <file>]  - One-off encryption
//!   cryptpack decrypt <file> --output <file>              - Decrypt a packet
//!   cryptpack backup [--daily]                            - Run the configured backup
//!   cryptpack iterations                                  - Show the deterministic count

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use cryptpack::{
    archive::{archive_and_encrypt_blocking, ArchiveEncryptor},
    backup::{backup_file_name, BackupJob},
    config::Config,
    crypto::{derive_iterations, Cipher},
    Error, Result,
};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "cryptpack")]
#[command(author = "cryptpack Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Password-derived encrypted directory backups")]
struct Cli {
    /// Configuration file path (environment variables override it;
    /// without it the environment alone is used)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive and encrypt a directory once
    Encrypt {
        /// Directory to archive (defaults to the configured source)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Output file (defaults to a timestamped name in the output dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Explicit iteration count (minimum 5000000); ignored when a
        /// secondary password is configured
        #[arg(long)]
        iterations: Option<u32>,
    },

    /// Decrypt an encrypted packet file
    Decrypt {
        /// Packet file to decrypt
        input: PathBuf,

        /// Where to write the decrypted bytes
        #[arg(long)]
        output: PathBuf,

        /// First iteration-count guess (defaults to the configured one)
        #[arg(long)]
        iterations: Option<u32>,
    },

    /// Run the configured backup
    Backup {
        /// Keep running and back up daily at the configured time
        #[arg(long)]
        daily: bool,
    },

    /// Print the deterministic iteration count for the configured passwords
    Iterations,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    if let Err(e) = run(cli).await {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Encrypt {
            source,
            output,
            iterations,
        } => cmd_encrypt(&config, source, output, iterations).await,

        Commands::Decrypt {
            input,
            output,
            iterations,
        } => cmd_decrypt(&config, input, output, iterations).await,

        Commands::Backup { daily } => cmd_backup(&config, daily).await,

        Commands::Iterations => cmd_iterations(&config),
    }
}

async fn cmd_encrypt(
    config: &Config,
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    iterations: Option<u32>,
) -> Result<()> {
    let source = source.unwrap_or_else(|| config.source_dir.clone());
    let output = output.unwrap_or_else(|| {
        config
            .output_dir
            .join(backup_file_name(&config.label, chrono::Local::now().naive_local()))
    });

    let encryptor = Arc::new(ArchiveEncryptor::new(Cipher::new(config.secret())));
    let (path, used) =
        archive_and_encrypt_blocking(encryptor, source, output, iterations).await?;

    info!("Encrypted archive: {}", path.display());
    info!(
        "Iterations used: {} (record this unless deterministic mode is configured)",
        used
    );
    Ok(())
}

async fn cmd_decrypt(
    config: &Config,
    input: PathBuf,
    output: PathBuf,
    iterations: Option<u32>,
) -> Result<()> {
    let preferred = iterations.unwrap_or(config.preferred_iterations);
    let cipher = Cipher::new(config.secret());

    let packet = tokio::fs::read(&input).await?;
    let plaintext = tokio::task::spawn_blocking(move || cipher.decrypt(&packet, preferred))
        .await
        .map_err(|e| Error::Internal(format!("Decrypt task panicked: {}", e)))??;

    tokio::fs::write(&output, &plaintext).await?;
    info!("Decrypted {} bytes to {}", plaintext.len(), output.display());
    Ok(())
}

async fn cmd_backup(config: &Config, daily: bool) -> Result<()> {
    let job = BackupJob::from_config(config);

    if daily {
        info!(
            "Running daily backups at {:02}:{:02}",
            config.schedule.hour, config.schedule.minute
        );
        // Delivery is external (a bot, a sync job, ...); here the file is
        // kept on disk for pickup.
        job.run_daily(|backup| {
            let iterations = backup.iterations();
            let path = backup.keep();
            info!("Backup ready: {} (iterations {})", path.display(), iterations);
            Ok(())
        })
        .await;
        return Ok(());
    }

    let backup = job.run_once().await?;
    let iterations = backup.iterations();
    let path = backup.keep();
    info!("Backup written: {} (iterations {})", path.display(), iterations);
    Ok(())
}

fn cmd_iterations(config: &Config) -> Result<()> {
    if config.password.is_empty() {
        return Err(Error::EncryptionUnavailable);
    }

    let count = derive_iterations(&config.password, &config.iterations_password);
    println!("{}", count);
    if config.iterations_password.is_empty() {
        info!("No secondary password configured; encryption will pick random counts");
    }
    Ok(())
}
