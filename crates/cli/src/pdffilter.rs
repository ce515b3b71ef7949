//! pdffilter - run PDF stream filters and digests from the command line
//!
//! Filters are named as they appear in a PDF `/Filter` array, so
//! `-f ASCII85Decode -f FlateDecode` decodes ASCII85 first and then inflates,
//! and encoding applies them in the opposite order.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use quire_core::codec::{Codec, CryptCodec};
use quire_core::crypto::{CipherKind, CryptoContext};
use quire_core::filter::sink::WriteSink;
use quire_core::filter::{DecodeParms, FilterChain, FilterKind};
use quire_core::HashingAlgorithm;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Cipher {
    /// RC4 (/CFM /V2)
    Rc4,
    /// AES-128-CBC (/CFM /AESV2)
    Aes128,
    /// AES-256-CBC (/CFM /AESV3)
    Aes256,
}

impl From<Cipher> for CipherKind {
    fn from(cipher: Cipher) -> Self {
        match cipher {
            Cipher::Rc4 => CipherKind::Rc4,
            Cipher::Aes128 => CipherKind::Aes128Cbc,
            Cipher::Aes256 => CipherKind::Aes256Cbc,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// Filter names in /Filter array order (e.g. FlateDecode, A85)
    #[arg(short = 'f', long = "filter", required = true)]
    filters: Vec<String>,

    /// Decode parameter for the last filter listed, as Key=Value
    #[arg(short = 'p', long = "parm")]
    parms: Vec<String>,

    /// Hex key for a Crypt filter
    #[arg(long)]
    key: Option<String>,

    /// Cipher for a Crypt filter
    #[arg(long, value_enum, default_value = "aes128")]
    cipher: Cipher,

    /// Input file (stdin if omitted or "-")
    input: Option<PathBuf>,

    /// Output file (stdout if omitted or "-")
    #[arg(short = 'o', long = "outfile")]
    outfile: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a stream through the named filters
    Encode(FilterArgs),
    /// Decode a stream through the named filters
    Decode(FilterArgs),
    /// Print the hex digest of a file
    Digest {
        #[arg(short = 'a', long, value_enum, default_value = "sha256")]
        algorithm: DigestAlgorithm,

        /// Input file (stdin if omitted or "-")
        input: Option<PathBuf>,
    },
}

/// Run PDF stream filters and digests.
#[derive(Parser, Debug)]
#[command(name = "pdffilter")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(file))
        }
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        _ => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn parse_parms(pairs: &[String]) -> Result<Option<DecodeParms>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let parms = pairs
        .iter()
        .map(|pair| DecodeParms::parse_pair(pair).with_context(|| format!("bad --parm {pair:?}")))
        .collect::<Result<DecodeParms>>()?;
    Ok(Some(parms))
}

/// Build the chain in encode order from names given in decode order.
fn build_chain(args: &FilterArgs) -> Result<FilterChain<WriteSink<Box<dyn Write>>>> {
    let mut parms = parse_parms(&args.parms)?;
    let ctx = Arc::new(CryptoContext::default());
    let mut chain = FilterChain::new();
    for name in args.filters.iter().rev() {
        let kind = FilterKind::from_name(name).with_context(|| format!("unknown filter {name}"))?;
        let codec = match kind {
            FilterKind::Crypt => {
                let Some(key) = args.key.as_deref() else {
                    bail!("the Crypt filter needs --key");
                };
                let key = hex::decode(key).context("--key must be hex")?;
                Codec::from(CryptCodec::new(Arc::clone(&ctx), args.cipher.into(), key))
            }
            other => Codec::for_kind(other)?,
        };
        // The last filter listed is the first one pushed.
        chain.push_with_parms(codec, parms.take());
    }
    tracing::debug!(stages = ?chain.kinds(), "filter chain built");
    Ok(chain)
}

fn run_filters(args: &FilterArgs, encode: bool) -> Result<()> {
    let mut chain = build_chain(args)?;
    let mut input = open_input(args.input.as_ref())?;
    let sink = WriteSink::new(open_output(args.outfile.as_ref())?);

    if encode {
        chain.begin_encode(sink)?;
    } else {
        chain.begin_decode(sink)?;
    }
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = input.read(&mut buf).context("failed to read input")?;
        if n == 0 {
            break;
        }
        if encode {
            chain.encode_block(&buf[..n])?;
        } else {
            chain.decode_block(&buf[..n])?;
        }
    }
    let sink = if encode { chain.end_encode()? } else { chain.end_decode()? };
    sink.into_inner().flush().context("failed to flush output")?;
    Ok(())
}

fn run_digest(algorithm: DigestAlgorithm, input: Option<&PathBuf>) -> Result<()> {
    let mut data = Vec::new();
    open_input(input)?
        .read_to_end(&mut data)
        .context("failed to read input")?;
    let ctx = CryptoContext::default();
    let digest = match algorithm {
        DigestAlgorithm::Md5 => ctx.compute_md5_hex(&data)?,
        DigestAlgorithm::Sha1 => ctx.compute_sha1_hex(&data)?,
        DigestAlgorithm::Sha256 => ctx.compute_digest_hex(&data, HashingAlgorithm::Sha256)?,
        DigestAlgorithm::Sha384 => ctx.compute_digest_hex(&data, HashingAlgorithm::Sha384)?,
        DigestAlgorithm::Sha512 => ctx.compute_digest_hex(&data, HashingAlgorithm::Sha512)?,
    };
    ctx.teardown()?;
    println!("{digest}");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    match &args.command {
        Command::Encode(filter_args) => run_filters(filter_args, true),
        Command::Decode(filter_args) => run_filters(filter_args, false),
        Command::Digest { algorithm, input } => run_digest(*algorithm, input.as_ref()),
    }
}
