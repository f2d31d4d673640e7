use clap::{Parser, Subcommand};
use ddsave::header::HEADER_SIZE;
use ddsave::{Container, ContainerState, Header, HeaderField, OpenOptions, SaveVariant};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ddsave", about = "Dragon's Dogma: Dark Arisen save container tool")]
struct Cli {
    /// Accept big-endian (console) headers. Their layout is unconfirmed.
    #[arg(long, global = true)]
    allow_big_endian: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the markup payload from a save
    Unpack {
        input: PathBuf,
        /// Defaults to `<INPUT>.xml`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build a save container from a save or a markup file
    Pack {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show header fields
    Info {
        input: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check stored sizes and checksum against the payload
    Verify {
        input: PathBuf,
    },
}

#[derive(Serialize)]
struct InfoReport<'a> {
    path:          &'a Path,
    description:   String,
    header:        &'a Header,
    variant:       SaveVariant,
    packed:        bool,
    raw_header:    String,
    payload_bytes: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let base = OpenOptions { allow_big_endian: cli.allow_big_endian, verify: false };

    match cli.command {

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, output } => {
            let save = open_save(&input, &base)?;
            let output = output.unwrap_or_else(|| with_suffix(&input, ".xml"));
            std::fs::write(&output, save.unpack())?;
            println!("Unpacked {} bytes to: {}", save.unpack().len(), output.display());
        }

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { input, output } => {
            let save = open_save(&input, &base)?;
            let packed = save.pack()?;
            let header = Header::parse(&packed[..HEADER_SIZE])?;
            std::fs::write(&output, &packed)?;
            println!("  payload     {} B", header.uncompressed_size);
            println!("  compressed  {} B", header.compressed_size);
            println!("  checksum    {:#010x}", header.checksum);
            println!("Created: {}", output.display());
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, json } => {
            let save   = open_save(&input, &base)?;
            let header = save.header();
            let report = InfoReport {
                path:          &input,
                description:   header.to_string(),
                header,
                variant:       header.variant(),
                packed:        save.state() == ContainerState::Loaded,
                raw_header:    hex::encode(header.serialize()),
                payload_bytes: save.unpack().len(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("── {} ──", report.description);
            println!("  Path           {}", input.display());
            println!("  Byte order     {}", header.endian().name());
            if !report.packed {
                println!("  (markup payload: size and checksum fields are filled on pack)");
            }
            for (i, field) in HeaderField::ALL.iter().enumerate() {
                println!("  [{i}] {:<18} {:#010x}", field.name(), header.field(*field));
            }
            println!("  Raw header     {}", report.raw_header);
            println!("  Payload        {} B", report.payload_bytes);
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let save = open_save(&input, &OpenOptions { verify: true, ..base })?;
            match save.state() {
                ContainerState::Loaded => {
                    let header = save.header();
                    println!("OK  {}", input.display());
                    println!("  uncompressed  {} B", header.uncompressed_size);
                    println!("  compressed    {} B", header.compressed_size);
                    println!("  checksum      {:#010x}", header.checksum);
                }
                ContainerState::Fresh => {
                    println!("{} is a markup payload; nothing to verify", input.display());
                }
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_save(path: &Path, opts: &OpenOptions) -> Result<Container, Box<dyn std::error::Error>> {
    let file = BufReader::new(File::open(path)?);
    Ok(Container::open_with(file, opts)?)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}
