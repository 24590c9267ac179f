//! Command-line Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("unable to open the index database")]
    Database,
    #[display("no library roots configured (set library.roots or pass --root)")]
    NoRoots,
    #[display("query failed")]
    Query,
    #[display("scan failed")]
    Scan,
    #[display("scan cancelled")]
    Cancelled,
}

impl ErrorKind {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Cancelled => 130,
            Self::Config | Self::NoRoots => 2,
            _ => 1,
        }
    }
}
