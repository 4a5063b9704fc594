use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use whisper::cli::{
    decode_file, encode_file, show_capacity, show_info, DecodeOptions, EncodeOptions,
};
use whisper::ChannelFactors;

/// Version info from build.rs
const VERSION: &str = env!("WHISPER_VERSION");
const BUILD: &str = env!("WHISPER_BUILD");
const PROFILE: &str = env!("WHISPER_PROFILE");
const GIT_HASH: &str = env!("WHISPER_GIT_HASH");

fn get_version() -> &'static str {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| {
        format!("{} {} build {} ({})", PROFILE, VERSION, BUILD, GIT_HASH)
    })
}

#[derive(Parser)]
#[command(name = "whisper")]
#[command(author, about = "Hide files in the low bits of 16-bit PCM WAV audio", long_about = None)]
struct Cli {
    /// Print version
    #[arg(short = 'V', long)]
    version: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a file inside a WAV container
    #[command(alias = "e")]
    Encode {
        /// File to hide
        payload: PathBuf,

        /// Container to read
        container_in: PathBuf,

        /// Container to write (must not exist)
        container_out: PathBuf,

        /// Payload threshold factor (0-12) and size factor (0-3)
        #[arg(
            short = 'c',
            long = "channel",
            num_args = 2,
            value_names = ["THRESHOLD_FACTOR", "SIZE_FACTOR"]
        )]
        channel: Option<Vec<u8>>,
    },

    /// Recover a hidden file from a WAV container
    #[command(alias = "d")]
    Decode {
        /// Container holding the hidden file
        container_in: PathBuf,

        /// Directory to write the recovered file into
        output_dir: Option<PathBuf>,
    },

    /// Show information about a WAV container
    #[command(alias = "i")]
    Info {
        /// Container to inspect
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report how many payload bytes a container can hold
    #[command(alias = "c")]
    Capacity {
        /// Container to measure
        file: PathBuf,

        /// Payload threshold factor (0-12) and size factor (0-3)
        #[arg(
            short = 'c',
            long = "channel",
            num_args = 2,
            value_names = ["THRESHOLD_FACTOR", "SIZE_FACTOR"]
        )]
        channel: Option<Vec<u8>>,

        /// Length of the filename that will be recorded
        #[arg(long, default_value = "12")]
        filename_len: usize,
    },
}

fn channel_factors(values: Option<Vec<u8>>) -> Option<ChannelFactors> {
    match values.as_deref() {
        Some([threshold_factor, size_factor]) => Some(ChannelFactors {
            threshold_factor: *threshold_factor,
            size_factor: *size_factor,
        }),
        _ => None,
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("whisper {}", get_version());
        return ExitCode::SUCCESS;
    }

    init_logging(cli.verbose);

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            let _ = Cli::command().print_help();
            println!();
            return ExitCode::SUCCESS;
        }
    };

    let result = match command {
        Commands::Encode {
            payload,
            container_in,
            container_out,
            channel,
        } => {
            let options = EncodeOptions {
                factors: channel_factors(channel),
            };

            encode_file(&payload, &container_in, &container_out, &options).map(|report| {
                println!(
                    "Hid {} ({} bytes) in {}",
                    payload.display(),
                    report.params.data_byte_count,
                    container_out.display()
                );
                println!(
                    "Samples read: {}, carrying data: {}, tail samples copied: {} ({} bytes)",
                    report.samples, report.carriers, report.tail_samples, report.tail_bytes
                );
            })
        }

        Commands::Decode {
            container_in,
            output_dir,
        } => {
            let options = DecodeOptions { output_dir };

            decode_file(&container_in, &options).map(|report| {
                println!(
                    "Recovered {} ({} bytes)",
                    report.path.display(),
                    report.bytes
                );
            })
        }

        Commands::Info { file, json } => show_info(&file, json).map(|info| print!("{}", info)),

        Commands::Capacity {
            file,
            channel,
            filename_len,
        } => show_capacity(&file, channel_factors(channel), filename_len)
            .map(|capacity| print!("{}", capacity)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
