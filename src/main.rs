//! gpio-dr
//!
//! Drives Raspberry Pi GPIO output pins through a memory-mapped register page,
//! controlled by `<pin>,<value>` text commands on a Unix socket.
//!
//! # Usage
//!
//! ```bash
//! # Serve commands on /run/gpio-dr.sock (needs access to /dev/mem)
//! sudo gpio-dr serve
//!
//! # Same, against an in-memory register page
//! gpio-dr serve --dry-run
//!
//! # Drive GPIO 4 high through the running server
//! gpio-dr send 4,1
//!
//! # Apply a single command directly and show the result
//! sudo gpio-dr apply 4,0
//!
//! # Show the register page
//! sudo gpio-dr dump
//!
//! # Write a starting config file
//! gpio-dr config -o /etc/gpio-dr.toml
//! ```

use anyhow::{Context, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{info, warn};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use gpio_dr::boards;
use gpio_dr::channel::{ProcEntry, Server};
use gpio_dr::config::Config;
use gpio_dr::hal::pin::regs;
use gpio_dr::hal::{GpioController, MappedRegisters, MemRegisters, RegisterBlock};

/// Name the pseudo-file is known by in logs
const ENTRY_NAME: &str = "gpio-dr";

/// Register writes kept by a dry-run server
const DRY_RUN_LOG_LIMIT: usize = 1024;

/// GPIO output driver
///
/// Memory-mapped GPIO control for Raspberry Pi boards
#[derive(Parser)]
#[command(name = "gpio-dr")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Raspberry Pi GPIO output driver with a text command channel")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Map the GPIO registers and serve commands on the socket
    Serve {
        /// Config file (default: /etc/gpio-dr.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use an in-memory register page instead of the device
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply one command directly and report the outcome
    Apply {
        /// Command in the form <pin>,<value> (e.g., 4,1)
        command: String,

        /// Config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use an in-memory register page instead of the device
        #[arg(long)]
        dry_run: bool,
    },

    /// Send a command to a running server and print its reply
    Send {
        /// Command in the form <pin>,<value>; omit to only read the greeting
        command: Option<String>,

        /// Socket path (overrides the config file)
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },

    /// Hex dump the GPIO register page
    Dump {
        /// Config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use an in-memory register page instead of the device
        #[arg(long)]
        dry_run: bool,
    },

    /// List supported board profiles
    Boards,

    /// Generate a default configuration file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::Serve { config, dry_run } => handle_serve(config.as_deref(), dry_run),
        Commands::Apply {
            command,
            config,
            dry_run,
        } => handle_apply(&command, config.as_deref(), dry_run),
        Commands::Send { command, socket } => handle_send(command.as_deref(), socket),
        Commands::Dump { config, dry_run } => handle_dump(config.as_deref(), dry_run),
        Commands::Boards => {
            print_boards();
            Ok(())
        }
        Commands::Config { output } => handle_config(output),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load_or_default(path).context("Failed to load configuration")?;
    info!("Board: {}", config.board_profile()?);
    Ok(config)
}

fn map_registers(config: &Config) -> Result<MappedRegisters> {
    let offset = config.map_offset()?;
    MappedRegisters::map(&config.mapping.device, offset, config.mapping.length).with_context(|| {
        format!(
            "Cannot map GPIO registers from {}",
            config.mapping.device.display()
        )
    })
}

fn handle_serve(config_path: Option<&Path>, dry_run: bool) -> Result<()> {
    let config = load_config(config_path)?;

    if dry_run {
        println!(
            "{} Dry run: using an in-memory register page",
            "[*]".cyan().bold()
        );
        let block = MemRegisters::new(config.mapping.length).with_log_limit(DRY_RUN_LOG_LIMIT);
        serve(block, &config)
    } else {
        serve(map_registers(&config)?, &config)
    }
}

fn serve<R>(block: R, config: &Config) -> Result<()>
where
    R: RegisterBlock + Send + 'static,
{
    let entry = Arc::new(ProcEntry::new(ENTRY_NAME, GpioController::new(block)));
    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;

    runtime.block_on(async {
        let server = Server::bind(&config.channel).with_context(|| {
            format!("Cannot bind {}", config.channel.socket.display())
        })?;
        println!(
            "{} Serving commands on {}",
            "[OK]".green().bold(),
            server.path().display().to_string().white()
        );
        server.run(entry, shutdown_signal()).await?;
        Ok::<_, anyhow::Error>(())
    })?;

    info!("GPIO registers released");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("SIGTERM handler unavailable: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
    info!("Shutting down");
}

fn handle_apply(command: &str, config_path: Option<&Path>, dry_run: bool) -> Result<()> {
    let config = load_config(config_path)?;

    if dry_run {
        let entry = ProcEntry::new(
            ENTRY_NAME,
            GpioController::new(MemRegisters::new(config.mapping.length)),
        );
        apply_one(&entry, command)?;

        let block = entry.into_controller().into_inner();
        println!("\n{}", "Register writes:".white().bold());
        for (offset, value) in block.writes() {
            println!("  {:<8} <- {:#010x}", register_name(*offset), value);
        }
        Ok(())
    } else {
        let entry = ProcEntry::new(ENTRY_NAME, GpioController::new(map_registers(&config)?));
        apply_one(&entry, command)
    }
}

fn apply_one<R: RegisterBlock>(entry: &ProcEntry<R>, command: &str) -> Result<()> {
    match entry.handle(command.as_bytes()) {
        Ok((pin, level)) => {
            println!(
                "{} GPIO{} driven {}",
                "[OK]".green().bold(),
                pin,
                level.to_string().white().bold()
            );
            Ok(())
        }
        Err(e) if e.is_validation() => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn handle_send(command: Option<&str>, socket: Option<PathBuf>) -> Result<()> {
    let socket = match socket {
        Some(path) => path,
        None => load_config(None)?.channel.socket,
    };

    let mut stream = UnixStream::connect(&socket)
        .with_context(|| format!("Cannot connect to {}", socket.display()))?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;

    if let Some(command) = command {
        println!("{} {}", "[TX]".cyan().bold(), command);
        stream.write_all(command.as_bytes())?;
    }
    stream.shutdown(std::net::Shutdown::Write)?;

    let mut reply = Vec::new();
    stream
        .read_to_end(&mut reply)
        .context("No reply from server")?;

    println!(
        "{} {}",
        "[RX]".green().bold(),
        String::from_utf8_lossy(&reply).trim_end()
    );
    Ok(())
}

fn handle_dump(config_path: Option<&Path>, dry_run: bool) -> Result<()> {
    let config = load_config(config_path)?;

    if dry_run {
        dump(&MemRegisters::new(config.mapping.length))
    } else {
        dump(&map_registers(&config)?)
    }
}

fn dump<R: RegisterBlock>(block: &R) -> Result<()> {
    println!("{}", "=".repeat(60));
    println!("{}", "GPIO Registers".cyan().bold());
    println!("{}", "=".repeat(60));

    for (name, offset) in regs::NAMED {
        println!("  {:<8} @ {:#04x}: {:#010x}", name, offset, block.read(*offset)?);
    }

    let mut page = Vec::with_capacity(block.len());
    for offset in (0..block.len()).step_by(4) {
        page.write_u32::<LittleEndian>(block.read(offset)?)?;
    }

    // Show at least the documented registers, then up to the last non-zero row
    let shown = page
        .chunks(16)
        .rposition(|row| row.iter().any(|b| *b != 0))
        .map_or(0, |row| (row + 1) * 16)
        .max(64)
        .min(page.len());

    println!("\n{}", "Page:".white().bold());
    hexdump::hexdump(&page[..shown]);
    if shown < page.len() {
        println!("  ({} trailing zero bytes)", page.len() - shown);
    }

    println!("\n{}", "=".repeat(60));
    Ok(())
}

fn register_name(offset: usize) -> String {
    regs::NAMED
        .iter()
        .find(|(_, o)| *o == offset)
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| format!("{:#04x}", offset))
}

fn print_boards() {
    println!("{}", "=".repeat(60));
    println!("{}", "Supported Boards".cyan().bold());
    println!("{}", "=".repeat(60));

    for board in boards::boards() {
        println!("\n  {}: {}", board.id.white().bold(), board.name);
        println!("    SoC: {}", board.soc);
        println!("    GPIO base: {:#010x}", board.gpio_base);

        let mut aliases: Vec<_> = boards::BOARDS
            .iter()
            .filter(|(alias, profile)| profile.id == board.id && **alias != board.id)
            .map(|(alias, _)| *alias)
            .collect();
        aliases.sort_unstable();
        println!("    Aliases: {}", aliases.join(", ").dimmed());
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "Use {} with {} to map from {} at offset 0",
        "board = \"<id>\"".cyan(),
        "device = \"/dev/gpiomem\"".cyan(),
        "/dev/gpiomem".white()
    );
}

fn handle_config(output: Option<PathBuf>) -> Result<()> {
    let content = Config::default().to_toml()?;

    if let Some(path) = output {
        std::fs::write(&path, &content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "{} Config written to {}",
            "[OK]".green().bold(),
            path.display()
        );
    } else {
        print!("{}", content);
    }

    Ok(())
}
