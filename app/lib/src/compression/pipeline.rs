//! Typed filter pipelines compiled from strategy parameters.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::compression::ParamValue;
use crate::error::{ConvertError, Result};

/// Registered filter ID of the LZO plugin.
pub const FILTER_LZO: u32 = 305;
/// Registered filter ID of the bzip2 plugin.
pub const FILTER_BZIP2: u32 = 307;
/// Registered filter ID of the LZF plugin.
pub const FILTER_LZF: u32 = 32000;
/// Registered filter ID of the blosc plugin.
pub const FILTER_BLOSC: u32 = 32001;
/// Registered filter ID of the LZ4 plugin.
pub const FILTER_LZ4: u32 = 32004;
/// Registered filter ID of the bitshuffle plugin.
pub const FILTER_BITSHUFFLE: u32 = 32008;
/// Registered filter ID of the ZFP plugin.
pub const FILTER_ZFP: u32 = 32013;
/// Registered filter ID of the Zstandard plugin.
pub const FILTER_ZSTD: u32 = 32015;

const KNOWN_KEYS: &[&str] = &[
    "filter",
    "level",
    "shuffle",
    "fletcher32",
    "compressor",
    "coding",
    "pixels_per_block",
    "mode",
    "precision",
    "lz4",
];

const CODEC_KEYS: &[&str] = &["level", "compressor", "coding", "pixels_per_block", "mode", "precision", "lz4"];

/// Codec keys each filter reads. `None` for filters that are not known.
fn codec_keys(filter: &str) -> Option<&'static [&'static str]> {
    match filter {
        "deflate" | "gzip" | "zlib" | "bzip2" | "zstd" => Some(&["level"]),
        "szip" => Some(&["coding", "pixels_per_block"]),
        "lzf" | "lzo" | "lz4" => Some(&[]),
        "bitshuffle" => Some(&["lz4"]),
        "zfp" => Some(&["mode", "precision"]),
        "blosc" => Some(&["compressor", "level"]),
        _ => None,
    }
}

/// Szip coding method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SzipCoding {
    /// Nearest-neighbor preprocessing
    NearestNeighbor,
    /// Entropy coding only
    Entropy,
}

/// ZFP compression mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZfpMode {
    /// Lossless
    Reversible,
    /// Fixed precision, in bit planes
    Precision(u32),
}

/// Compressor used inside the blosc meta-codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BloscCompressor {
    /// blosc's own LZ77 variant
    BloscLz,
    /// LZ4
    Lz4,
    /// LZ4 high-compression
    Lz4Hc,
    /// Snappy
    Snappy,
    /// zlib
    Zlib,
    /// Zstandard
    Zstd,
}

impl BloscCompressor {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "blosclz" => Some(BloscCompressor::BloscLz),
            "lz4" => Some(BloscCompressor::Lz4),
            "lz4hc" => Some(BloscCompressor::Lz4Hc),
            "snappy" => Some(BloscCompressor::Snappy),
            "zlib" => Some(BloscCompressor::Zlib),
            "zstd" => Some(BloscCompressor::Zstd),
            _ => None,
        }
    }

    /// Compressor code in the blosc filter's `cd_values`.
    pub fn code(&self) -> u32 {
        match self {
            BloscCompressor::BloscLz => 0,
            BloscCompressor::Lz4 => 1,
            BloscCompressor::Lz4Hc => 2,
            BloscCompressor::Snappy => 3,
            BloscCompressor::Zlib => 4,
            BloscCompressor::Zstd => 5,
        }
    }
}

/// One compression codec of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "codec", rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Codec {
    /// Built-in gzip/zlib filter, level 0-9
    Deflate { level: u8 },
    /// Built-in szip filter
    Szip { coding: SzipCoding, pixels_per_block: u8 },
    /// LZF plugin
    Lzf,
    /// LZO plugin
    Lzo,
    /// bzip2 plugin, level 1-9
    Bzip2 { level: u8 },
    /// LZ4 plugin
    Lz4,
    /// Zstandard plugin, level 1-22
    Zstd { level: u8 },
    /// Bitshuffle plugin, optionally followed by LZ4
    Bitshuffle { lz4: bool },
    /// ZFP plugin
    Zfp { mode: ZfpMode },
    /// blosc meta-codec; `shuffle` is blosc's internal byte shuffle
    Blosc { compressor: BloscCompressor, level: u8, shuffle: bool },
}

impl Codec {
    /// Short codec name used in logs and store errors.
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Deflate { .. } => "deflate",
            Codec::Szip { .. } => "szip",
            Codec::Lzf => "lzf",
            Codec::Lzo => "lzo",
            Codec::Bzip2 { .. } => "bzip2",
            Codec::Lz4 => "lz4",
            Codec::Zstd { .. } => "zstd",
            Codec::Bitshuffle { .. } => "bitshuffle",
            Codec::Zfp { .. } => "zfp",
            Codec::Blosc { .. } => "blosc",
        }
    }

    /// Plugin filter ID and `cd_values`, or `None` for the built-in
    /// deflate and szip filters.
    pub fn plugin(&self) -> Option<(u32, Vec<u32>)> {
        match *self {
            Codec::Deflate { .. } | Codec::Szip { .. } => None,
            Codec::Lzo => Some((FILTER_LZO, Vec::new())),
            Codec::Bzip2 { level } => Some((FILTER_BZIP2, vec![level as u32])),
            Codec::Lzf => Some((FILTER_LZF, Vec::new())),
            Codec::Blosc { compressor, level, shuffle } => Some((
                FILTER_BLOSC,
                vec![0, 0, 0, 0, level as u32, shuffle as u32, compressor.code()],
            )),
            Codec::Lz4 => Some((FILTER_LZ4, vec![0])),
            Codec::Bitshuffle { lz4 } => {
                Some((FILTER_BITSHUFFLE, vec![0, 0, 0, 0, if lz4 { 2 } else { 0 }]))
            }
            Codec::Zfp { mode: ZfpMode::Reversible } => Some((FILTER_ZFP, vec![5, 0])),
            Codec::Zfp { mode: ZfpMode::Precision(bits) } => Some((FILTER_ZFP, vec![2, 0, bits])),
            Codec::Zstd { level } => Some((FILTER_ZSTD, vec![level as u32])),
        }
    }
}

/// Dataset-creation filters in application order: shuffle, codec, checksum.
///
/// An empty pipeline means the data is stored uncompressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FilterPipeline {
    /// Byte-shuffle before the codec
    pub shuffle: bool,
    /// Compression codec
    pub codec: Option<Codec>,
    /// Fletcher32 checksum after the codec
    pub fletcher32: bool,
}

impl FilterPipeline {
    /// A pipeline that stores data as is.
    pub fn none() -> Self {
        Self::default()
    }

    /// Check whether the pipeline applies no filter at all.
    pub fn is_empty(&self) -> bool {
        !self.shuffle && self.codec.is_none() && !self.fletcher32
    }

    /// Compile strategy parameters.
    ///
    /// Unknown keys, keys the chosen filter does not read, wrong value types
    /// and out-of-range values are all reported as
    /// [`ConvertError::InvalidParameter`].
    pub fn from_parameters(strategy: &str, params: &BTreeMap<String, ParamValue>) -> Result<Self> {
        let reader = Params { strategy, params };

        if let Some(key) = params.keys().find(|k| !KNOWN_KEYS.contains(&k.as_str())) {
            return Err(reader.invalid(key, "unknown parameter"));
        }

        let shuffle = reader.flag("shuffle")?.unwrap_or(false);
        let fletcher32 = reader.flag("fletcher32")?.unwrap_or(false);

        let filter = reader.text("filter")?;
        if let Some((name, allowed)) = filter.and_then(|name| codec_keys(name).map(|keys| (name, keys))) {
            if let Some(key) = CODEC_KEYS
                .iter()
                .find(|k| params.contains_key(**k) && !allowed.contains(k))
            {
                return Err(reader.invalid(key, &format!("does not apply to filter {}", name)));
            }
        }

        let codec = match filter {
            None => {
                if let Some(key) = CODEC_KEYS.iter().find(|k| params.contains_key(**k)) {
                    return Err(reader.invalid(key, "requires a filter"));
                }
                None
            }
            Some("deflate") | Some("gzip") | Some("zlib") => Some(Codec::Deflate {
                level: reader.level(0, 9, 4)?,
            }),
            Some("szip") => {
                let coding = match reader.text("coding")?.unwrap_or("nn") {
                    "nn" => SzipCoding::NearestNeighbor,
                    "ec" => SzipCoding::Entropy,
                    other => return Err(reader.invalid("coding", &format!("unknown szip coding {}", other))),
                };
                let pixels_per_block = match reader.int("pixels_per_block")?.unwrap_or(8) {
                    ppb @ 2..=32 if ppb % 2 == 0 => ppb as u8,
                    ppb => {
                        return Err(reader.invalid(
                            "pixels_per_block",
                            &format!("{} is not an even number between 2 and 32", ppb),
                        ))
                    }
                };
                Some(Codec::Szip { coding, pixels_per_block })
            }
            Some("lzf") => Some(Codec::Lzf),
            Some("lzo") => Some(Codec::Lzo),
            Some("bzip2") => Some(Codec::Bzip2 {
                level: reader.level(1, 9, 9)?,
            }),
            Some("lz4") => Some(Codec::Lz4),
            Some("zstd") => Some(Codec::Zstd {
                level: reader.level(1, 22, 3)?,
            }),
            Some("bitshuffle") => Some(Codec::Bitshuffle {
                lz4: reader.flag("lz4")?.unwrap_or(true),
            }),
            Some("zfp") => {
                let mode = match reader.text("mode")?.unwrap_or("reversible") {
                    "reversible" if params.contains_key("precision") => {
                        return Err(reader.invalid("precision", "only applies in precision mode"))
                    }
                    "reversible" => ZfpMode::Reversible,
                    "precision" => match reader.int("precision")? {
                        Some(bits @ 1..=64) => ZfpMode::Precision(bits as u32),
                        Some(bits) => {
                            return Err(reader.invalid("precision", &format!("{} is outside 1..=64", bits)))
                        }
                        None => return Err(reader.invalid("precision", "required in precision mode")),
                    },
                    other => return Err(reader.invalid("mode", &format!("unknown zfp mode {}", other))),
                };
                Some(Codec::Zfp { mode })
            }
            Some("blosc") => {
                let name = reader.text("compressor")?.unwrap_or("blosclz");
                let compressor = BloscCompressor::parse(name)
                    .ok_or_else(|| reader.invalid("compressor", &format!("unknown blosc compressor {}", name)))?;
                let level = reader.level(0, 9, 9)?;
                // The shuffle flag is applied inside blosc, not as a separate filter.
                return Ok(Self {
                    shuffle: false,
                    codec: Some(Codec::Blosc { compressor, level, shuffle }),
                    fletcher32,
                });
            }
            Some(other) => return Err(reader.invalid("filter", &format!("unknown filter {}", other))),
        };

        Ok(Self { shuffle, codec, fletcher32 })
    }
}

impl fmt::Display for FilterPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stages = Vec::new();
        if self.shuffle {
            stages.push("shuffle".to_string());
        }
        match self.codec {
            Some(Codec::Deflate { level }) => stages.push(format!("deflate({})", level)),
            Some(Codec::Blosc { compressor, level, shuffle }) => stages.push(format!(
                "blosc({:?}, {}{})",
                compressor,
                level,
                if shuffle { ", shuffle" } else { "" }
            )),
            Some(codec) => stages.push(codec.name().to_string()),
            None => {}
        }
        if self.fletcher32 {
            stages.push("fletcher32".to_string());
        }

        if stages.is_empty() {
            f.write_str("uncompressed")
        } else {
            f.write_str(&stages.join(" -> "))
        }
    }
}

struct Params<'a> {
    strategy: &'a str,
    params: &'a BTreeMap<String, ParamValue>,
}

impl<'a> Params<'a> {
    fn invalid(&self, key: &str, message: &str) -> ConvertError {
        ConvertError::InvalidParameter {
            strategy: self.strategy.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    fn flag(&self, key: &str) -> Result<Option<bool>> {
        match self.params.get(key) {
            None => Ok(None),
            Some(value) => value.as_bool().map(Some).ok_or_else(|| self.invalid(key, "expected a boolean")),
        }
    }

    fn int(&self, key: &str) -> Result<Option<i64>> {
        match self.params.get(key) {
            None => Ok(None),
            Some(value) => value.as_int().map(Some).ok_or_else(|| self.invalid(key, "expected an integer")),
        }
    }

    fn text(&self, key: &str) -> Result<Option<&'a str>> {
        match self.params.get(key) {
            None => Ok(None),
            Some(value) => value.as_text().map(Some).ok_or_else(|| self.invalid(key, "expected a string")),
        }
    }

    fn level(&self, min: u8, max: u8, default: u8) -> Result<u8> {
        match self.int("level")? {
            None => Ok(default),
            Some(level) if (min as i64..=max as i64).contains(&level) => Ok(level as u8),
            Some(level) => Err(self.invalid("level", &format!("{} is outside {}..={}", level, min, max))),
        }
    }
}
