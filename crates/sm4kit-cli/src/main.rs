use clap::{Parser, Subcommand};
use log::{debug, LevelFilter};
use sm4kit_crypto::sm4::Backend;
use sm4kit_types::CryptoError;

mod caps;
mod dgst;
mod enc;
mod selftest;
mod speed;

/// SM4 / SM4-GCM / SM3 command-line tool with runtime backend selection.
#[derive(Parser)]
#[command(name = "sm4kit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SM4 backend: auto, basic, table, aes-ni, gfni, avx512-gfni.
    #[arg(short, long, global = true)]
    backend: Option<String>,
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show detected CPU features and the SM4 backend they select.
    Caps,
    /// Measure throughput of each supported backend.
    Speed {
        /// Algorithm (sm4-ecb, sm4-gcm, sm3, all).
        #[arg(default_value = "all")]
        algorithm: String,
        /// Seconds per measurement.
        #[arg(short, long, default_value = "3")]
        seconds: u64,
    },
    /// Run known-answer and cross-backend self-tests.
    Selftest {
        /// Include the 1,000,000-iteration SM4 test.
        #[arg(long)]
        full: bool,
    },
    /// Authenticated file encryption/decryption.
    Enc {
        /// Cipher algorithm (sm4-gcm).
        #[arg(short, long, default_value = "sm4-gcm")]
        cipher: String,
        /// Decrypt mode.
        #[arg(short, long)]
        decrypt: bool,
        /// Input file.
        #[arg(short, long)]
        input: String,
        /// Output file.
        #[arg(short, long)]
        output: String,
        /// Hex key; falls back to SM4KIT_KEY, or a random key when encrypting.
        #[arg(short, long)]
        key: Option<String>,
        /// Hex associated data.
        #[arg(long)]
        aad: Option<String>,
    },
    /// SM3 digest of a file.
    Dgst {
        /// Input file (use - for stdin).
        file: String,
    },
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    builder.format_timestamp(None);
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

/// `None` leaves the choice to [`Backend::preferred`].
fn resolve_backend(name: Option<&str>) -> Result<Option<Backend>, CryptoError> {
    match name {
        None => Ok(None),
        Some(n) if n.eq_ignore_ascii_case("auto") => Ok(None),
        Some(n) => {
            let backend: Backend = n.parse()?;
            if !backend.is_supported() {
                return Err(CryptoError::BackendUnavailable(backend.name()));
            }
            Ok(Some(backend))
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let backend = resolve_backend(cli.backend.as_deref())?;
    debug!("backend: {}", backend.unwrap_or_else(Backend::preferred));

    match &cli.command {
        Commands::Caps => caps::run(backend.unwrap_or_else(Backend::preferred)),
        Commands::Speed { algorithm, seconds } => speed::run(algorithm, *seconds, backend),
        Commands::Selftest { full } => selftest::run(*full),
        Commands::Enc {
            cipher,
            decrypt,
            input,
            output,
            key,
            aad,
        } => enc::run(&enc::EncArgs {
            cipher,
            decrypt: *decrypt,
            input,
            output,
            key: key.as_deref(),
            aad: aad.as_deref(),
            backend,
        }),
        Commands::Dgst { file } => dgst::run(file),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
