use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use courier_core::config::Config;
use courier_core::core_content::{
    ContentCodec, EncodedContent, RemoteAttachment, RemoteAttachmentCodec,
};
use courier_core::core_conversation::{Conversation, ConversationImporter};
use courier_core::core_crypto::RustCryptoProvider;
use courier_core::core_identity::LocalWallet;
use courier_core::core_transport::InMemoryTransport;
use courier_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use courier_core::telemetry::init_metrics;
use courier_core::{Bootstrapper, ClientOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

mod files;

use files::{expand_path, FileAttachment, FileCodec, LocalFileFetcher};

#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Override the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Configuration file (TOML). Defaults to COURIER_* environment variables.
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encrypt a file for upload and print the attachment reference
    Encrypt {
        /// File to encrypt
        input: String,

        /// Where to write the encrypted payload
        #[arg(short, long)]
        output: String,

        /// https:// url the payload will be uploaded to
        #[arg(short, long)]
        url: String,

        /// Where to write the encoded reference (JSON). Printed when omitted.
        #[arg(short, long)]
        reference: Option<String>,
    },

    /// Verify and decrypt a downloaded payload using its reference
    Decrypt {
        /// Encoded reference written by `encrypt`
        reference: String,

        /// Downloaded payload
        #[arg(short, long)]
        payload: String,

        /// Directory to write the decrypted file into
        #[arg(short, long, default_value = ".")]
        output_dir: String,
    },

    /// Parse a conversation export and describe it
    Import {
        /// Exported conversation (JSON)
        file: String,
    },

    /// Bootstrap an identity against an in-memory store, twice
    Bootstrap {
        /// 32-byte wallet seed in hex; random when omitted
        #[arg(long)]
        seed: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(raw) => Config::from_file(expand_path(raw)?).context("loading configuration file"),
        None => Config::from_env().context("loading configuration from environment"),
    }
}

fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let mut log_config = LogConfig::try_from(&config.logging)?;
    if let Some(level) = &args.log_level {
        log_config = LogConfig::new(level.parse::<LogLevel>()?).with_target(config.logging.with_target);
    }
    if args.json_logs {
        log_config = log_config.json_format(true);
    }
    init_logging_with_config(log_config)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    init_logging(&args, &config)?;
    init_metrics();

    info!(
        env = %config.api.env,
        endpoint = %config.api.endpoint(),
        app_version = config.api.app_version.as_deref().unwrap_or("unset"),
        "Courier CLI started"
    );

    match args.command {
        Command::Encrypt {
            input,
            output,
            url,
            reference,
        } => encrypt(&input, &output, &url, reference.as_deref()).await?,
        Command::Decrypt {
            reference,
            payload,
            output_dir,
        } => decrypt(&reference, &payload, &output_dir).await?,
        Command::Import { file } => import(&file)?,
        Command::Bootstrap { seed } => bootstrap(config, seed.as_deref()).await?,
    }

    Ok(())
}

async fn encrypt(input: &str, output: &str, url: &str, reference: Option<&str>) -> Result<()> {
    let input = expand_path(input)?;
    let data = tokio::fs::read(&input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let filename = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = FileAttachment { filename, data };
    let encrypted =
        RemoteAttachment::encode_encrypted(&file, &FileCodec, &RustCryptoProvider::new()).await?;

    let output = expand_path(output)?;
    tokio::fs::write(&output, &encrypted.payload)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    let attachment = RemoteAttachment::from_encrypted(url, &encrypted)?
        .with_metadata(Some(encrypted.payload.len() as u64), Some(file.filename));
    let encoded = RemoteAttachmentCodec::new().encode(&attachment)?;
    let json = serde_json::to_string_pretty(&encoded)?;

    match reference {
        Some(path) => {
            let path = expand_path(path)?;
            tokio::fs::write(&path, json).await?;
            info!(reference = %path.display(), "Wrote attachment reference");
        }
        None => println!("{}", json),
    }

    info!(digest = %encrypted.digest, bytes = encrypted.payload.len(), "Encrypted attachment");
    Ok(())
}

async fn decrypt(reference: &str, payload: &str, output_dir: &str) -> Result<()> {
    let reference = expand_path(reference)?;
    let json = tokio::fs::read_to_string(&reference)
        .await
        .with_context(|| format!("reading {}", reference.display()))?;
    let encoded: EncodedContent = serde_json::from_str(&json).context("parsing reference")?;

    let codec = RemoteAttachmentCodec::new()
        .with_fetcher(Arc::new(LocalFileFetcher::new(expand_path(payload)?)));
    let attachment = codec.decode(&encoded)?;
    let file = FileCodec.decode(&attachment.content().await?)?;

    // Never let a reference choose where outside output_dir we write
    let Some(name) = Path::new(&file.filename).file_name() else {
        bail!("attachment has no usable filename");
    };
    let destination = expand_path(output_dir)?.join(name);
    tokio::fs::write(&destination, &file.data)
        .await
        .with_context(|| format!("writing {}", destination.display()))?;

    println!("{}", destination.display());
    Ok(())
}

fn import(file: &str) -> Result<()> {
    let path = expand_path(file)?;
    let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;

    match ConversationImporter::new().import(&bytes)? {
        Conversation::V1(c) => {
            println!("legacy conversation with {} started {}", c.peer_address, c.created_at);
        }
        Conversation::V2(c) => {
            println!("conversation with {} on topic {}", c.peer_address, c.topic);
            if !c.context.conversation_id.is_empty() {
                println!("  conversation id: {}", c.context.conversation_id);
            }
            for (key, value) in &c.context.metadata {
                println!("  {} = {}", key, value);
            }
        }
    }
    Ok(())
}

async fn bootstrap(config: Config, seed: Option<&str>) -> Result<()> {
    let wallet = match seed {
        Some(raw) => LocalWallet::from_seed(&hex_seed(raw)?),
        None => LocalWallet::generate(),
    };
    let transport = Arc::new(InMemoryTransport::with_token_max_age(config.auth.token_max_age));
    let options = ClientOptions::new(config);

    for run in 1..=2 {
        let bootstrapper = Bootstrapper::new(transport.clone(), options.clone());
        let state = bootstrapper.state();
        let client = bootstrapper.run(&wallet).await?;
        println!(
            "run {}: {} reached {:?}, {} publishes so far",
            run,
            client.address(),
            state.get(),
            transport.publish_count()
        );
    }
    Ok(())
}

fn hex_seed(raw: &str) -> Result<[u8; 32]> {
    let decoded = hex::decode(raw.trim_start_matches("0x")).context("seed is not hex")?;
    match <[u8; 32]>::try_from(decoded.as_slice()) {
        Ok(seed) => Ok(seed),
        Err(_) => bail!("seed must be 32 bytes, got {}", decoded.len()),
    }
}
