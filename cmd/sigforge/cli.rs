use std::{num::NonZeroUsize, str::FromStr, time::Duration};

use clap::{Parser as ClapParser, ValueEnum};
use sigforge::{CompactRecovery, K256Crypto, NativeCrypto};
use tracing::Level;

pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

#[derive(ClapParser, Debug)]
#[command(
    name = "sigforge",
    author,
    version = VERSION_STRING,
    about = "Forge ECDSA signatures whose bytes start with chosen content",
    long_about = None
)]
pub struct Options {
    #[arg(
        long = "prefix",
        value_name = "HEX",
        env = "SIGFORGE_PREFIX",
        conflicts_with = "prefix_text",
        required_unless_present = "prefix_text",
        help = "Bytes the signature must start with, hex encoded",
        long_help = "At most 56 bytes. If 32 or more bytes are given, the first 32 must be a valid secp256k1 x-coordinate."
    )]
    pub prefix: Option<HexBytes>,
    #[arg(
        long = "prefix-text",
        value_name = "TEXT",
        env = "SIGFORGE_PREFIX_TEXT",
        help = "Like --prefix, but takes UTF-8 text"
    )]
    pub prefix_text: Option<String>,
    #[arg(
        long = "message",
        value_name = "HEX",
        env = "SIGFORGE_MESSAGE",
        help = "Message the signature is valid for, hex encoded",
        long_help = "Never hashed. Input longer than 32 bytes is truncated to its leftmost 32 bytes, shorter input is read as a big-endian integer."
    )]
    pub message: HexBytes,
    #[arg(
        long = "workers",
        value_name = "NUMBER",
        env = "SIGFORGE_WORKERS",
        default_value = "1",
        help = "Number of threads racing for a signature"
    )]
    pub workers: NonZeroUsize,
    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        env = "SIGFORGE_TIMEOUT",
        help = "Give up after this many seconds"
    )]
    pub timeout: Option<u64>,
    #[arg(
        long = "backend",
        value_enum,
        default_value_t = Backend::Native,
        env = "SIGFORGE_BACKEND",
        help = "Curve library used for recovery"
    )]
    pub backend: Backend,
    #[arg(long = "json", help = "Print the result as JSON")]
    pub json: bool,
    #[arg(long = "log.level", default_value_t = Level::INFO, value_name = "LOG_LEVEL")]
    pub log_level: Level,
}

impl Options {
    pub fn prefix_bytes(&self) -> Vec<u8> {
        match (&self.prefix, &self.prefix_text) {
            (Some(prefix), _) => prefix.0.clone(),
            (None, Some(text)) => text.as_bytes().to_vec(),
            (None, None) => Vec::new(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// libsecp256k1
    Native,
    /// Pure Rust k256
    K256,
}

impl Backend {
    pub fn crypto(self) -> &'static dyn CompactRecovery {
        match self {
            Backend::Native => &NativeCrypto,
            Backend::K256 => &K256Crypto,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::K256 => "k256",
        }
    }
}

/// Hex argument, with or without a `0x` prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(s).map(HexBytes)
    }
}
