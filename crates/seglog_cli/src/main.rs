use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use seglog_core::{Config, Record, SegError, Segment};

const DEFAULT_MAX_BYTES: u64 = 1 << 20;

#[derive(Parser)]
#[command(name = "seglog", about = "seglog: inspect and maintain commit-log segments")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct SegmentArgs {
    /// Log directory holding `<base>.store` / `<base>.index`
    #[arg(long)]
    dir: PathBuf,
    #[arg(long, default_value_t = 0)]
    base: u64,
    /// JSON config file; takes precedence over the byte limit flags
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
    max_store_bytes: u64,
    #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
    max_index_bytes: u64,
}

#[derive(Subcommand)]
enum Cmd {
    /// Append values; prints the offset assigned to each
    Append {
        #[command(flatten)]
        seg: SegmentArgs,
        #[arg(long = "value", required = true, num_args = 1..)]
        values: Vec<String>,
    },

    Read {
        #[command(flatten)]
        seg: SegmentArgs,
        #[arg(long)]
        offset: u64,
        #[arg(long, default_value_t = false)]
        hex: bool,
    },

    Info {
        #[command(flatten)]
        seg: SegmentArgs,
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print every record in offset order
    Dump {
        #[command(flatten)]
        seg: SegmentArgs,
        #[arg(long, default_value_t = false)]
        hex: bool,
    },

    Verify {
        #[command(flatten)]
        seg: SegmentArgs,
    },

    Remove {
        #[command(flatten)]
        seg: SegmentArgs,
    },
}

fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p)?;
    Ok(())
}

fn load_config(args: &SegmentArgs) -> Result<Config> {
    let c = match &args.config {
        Some(p) => Config::load(p).with_context(|| format!("config {}", p.display()))?,
        None => Config::new(args.max_store_bytes, args.max_index_bytes),
    };
    c.validate()?;
    Ok(c)
}

fn open_segment(args: &SegmentArgs) -> Result<Segment> {
    ensure_dir(&args.dir)?;
    let config = load_config(args)?;
    Segment::open(&args.dir, args.base, config)
        .with_context(|| format!("open segment {} in {}", args.base, args.dir.display()))
}

fn render(value: &[u8], as_hex: bool) -> String {
    if as_hex {
        hex::encode(value)
    } else {
        String::from_utf8_lossy(value).into_owned()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Append { seg, values } => {
            let mut s = open_segment(&seg)?;
            for v in values {
                if s.is_maxed() {
                    let next = s.next_offset();
                    s.close()?;
                    bail!("segment {} is maxed at offset {next}", seg.base);
                }
                let mut rec = Record::new(v.into_bytes());
                match s.append(&mut rec) {
                    Ok(off) => println!("{off}"),
                    Err(SegError::Eof) => {
                        s.close()?;
                        bail!("segment {} index is full", seg.base);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            info!(next_offset = s.next_offset(), "append done");
            s.close()?;
        }
        Cmd::Read { seg, offset, hex } => {
            let mut s = open_segment(&seg)?;
            let rec = s
                .read(offset)
                .with_context(|| format!("read offset {offset}"))?;
            println!("{}", render(&rec.value, hex));
            s.close()?;
        }
        Cmd::Info { seg, json } => {
            let s = open_segment(&seg)?;
            let st = s.stats();
            s.close()?;
            if json {
                println!("{}", serde_json::to_string(&st)?);
            } else {
                println!("base_offset:    {}", st.base_offset);
                println!("next_offset:    {}", st.next_offset);
                println!("records:        {}", st.next_offset - st.base_offset);
                println!("store_bytes:    {}", st.store_bytes);
                println!("index_bytes:    {} / {}", st.index_bytes, st.index_capacity);
                println!("maxed:          {}", st.maxed);
            }
        }
        Cmd::Dump { seg, hex } => {
            let mut s = open_segment(&seg)?;
            for off in s.base_offset()..s.next_offset() {
                let rec = s.read(off).with_context(|| format!("read offset {off}"))?;
                println!("{off}\t{}", render(&rec.value, hex));
            }
            s.close()?;
        }
        Cmd::Verify { seg } => {
            let mut s = open_segment(&seg)?;
            let report = s.verify()?;
            s.close()?;
            println!(
                "verify: entries={} indexed={} orphaned={} bad_positions={}",
                report.entries, report.indexed, report.orphaned, report.bad_positions
            );
            if report.orphaned > 0 {
                warn!(orphaned = report.orphaned, "store has unindexed tail entries");
            }
            if report.bad_positions > 0 {
                bail!("index has {} bad entries", report.bad_positions);
            }
        }
        Cmd::Remove { seg } => {
            let s = open_segment(&seg)?;
            s.remove()?;
            println!("removed: {}", seg.base);
        }
    }
    Ok(())
}
