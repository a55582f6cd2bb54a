//! Compression facade for spill segments (feature-gated).
//!
//! Synchronous and tiny on purpose. Only `None`, `Zstd`, `Lz4` are supported.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Codec {
    None = 0,
    Zstd = 1,
    Lz4 = 2,
}

impl Codec {
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Codec::None),
            1 => Ok(Codec::Zstd),
            2 => Ok(Codec::Lz4),
            other => Err(Error::CodecUnsupported(format!("tag {other}"))),
        }
    }

    /// Parse the config spelling (`none`, `zstd`, `lz4`).
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Codec::None),
            "zstd" => Ok(Codec::Zstd),
            "lz4" => Ok(Codec::Lz4),
            other => Err(Error::CodecUnsupported(other.to_string())),
        }
    }

    pub fn compress(self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(input.to_vec()),
            Codec::Zstd => {
                #[cfg(feature = "zstd")]
                {
                    zstd::stream::encode_all(input, 3)
                        .map_err(|e| Error::Codec(format!("zstd: {e}")))
                }
                #[cfg(not(feature = "zstd"))]
                {
                    Err(Error::CodecUnsupported("zstd (feature disabled)".into()))
                }
            }
            Codec::Lz4 => {
                #[cfg(feature = "lz4")]
                {
                    Ok(lz4_flex::compress_prepend_size(input))
                }
                #[cfg(not(feature = "lz4"))]
                {
                    Err(Error::CodecUnsupported("lz4 (feature disabled)".into()))
                }
            }
        }
    }

    pub fn decompress(self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(input.to_vec()),
            Codec::Zstd => {
                #[cfg(feature = "zstd")]
                {
                    zstd::stream::decode_all(input)
                        .map_err(|e| Error::Codec(format!("zstd: {e}")))
                }
                #[cfg(not(feature = "zstd"))]
                {
                    Err(Error::CodecUnsupported("zstd (feature disabled)".into()))
                }
            }
            Codec::Lz4 => {
                #[cfg(feature = "lz4")]
                {
                    lz4_flex::decompress_size_prepended(input)
                        .map_err(|e| Error::Codec(format!("lz4: {e}")))
                }
                #[cfg(not(feature = "lz4"))]
                {
                    Err(Error::CodecUnsupported("lz4 (feature disabled)".into()))
                }
            }
        }
    }
}
