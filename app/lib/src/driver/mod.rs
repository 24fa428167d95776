//! Conversion orchestration.
//!
//! The [`ConversionDriver`] parses a source log once, builds one shared
//! [`RecordSet`], then fans out over the requested [`ConversionPair`]s on a
//! rayon pool. Each pair succeeds or fails on its own; the run only aborts
//! when the source itself cannot be read or parsed.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::compression::{BackendKind, CompressionCatalog, CompressionStrategy};
use crate::config::ConverterConfig;
use crate::convert::RecordSet;
use crate::encode::naming::{output_path, OutputBase};
use crate::encode::EncoderSet;
use crate::error::{ConvertError, Result};
use crate::logfmt::{LineError, LogParser};
use crate::store::{default_store, StructuredStore};

mod stats;

pub use stats::{ConversionStats, StatsSnapshot};

/// One requested output: a backend and a strategy name.
///
/// Parses from `backend:strategy`. The split is at the first `:`, so
/// `table:blosc:lz4` names the `blosc:lz4` strategy.
///
/// # Examples
///
/// ```
/// use accel_convert::{BackendKind, ConversionPair};
///
/// let pair: ConversionPair = "table:blosc:lz4".parse().unwrap();
/// assert_eq!(pair.backend, BackendKind::Table);
/// assert_eq!(pair.strategy, "blosc:lz4");
/// assert_eq!(pair.to_string(), "table:blosc:lz4");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PairRepr")]
pub struct ConversionPair {
    /// Output backend
    pub backend: BackendKind,
    /// Strategy name in the catalog
    pub strategy: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PairRepr {
    Text(String),
    Fields { backend: BackendKind, strategy: String },
}

impl TryFrom<PairRepr> for ConversionPair {
    type Error = ConvertError;

    fn try_from(repr: PairRepr) -> Result<Self> {
        match repr {
            PairRepr::Text(text) => text.parse(),
            PairRepr::Fields { backend, strategy } => Ok(ConversionPair::new(backend, strategy)),
        }
    }
}

impl ConversionPair {
    /// Create a pair.
    pub fn new<S: Into<String>>(backend: BackendKind, strategy: S) -> Self {
        Self {
            backend,
            strategy: strategy.into(),
        }
    }

    /// Every backend with every strategy the catalog allows for it.
    pub fn all(catalog: &CompressionCatalog) -> Vec<ConversionPair> {
        BackendKind::ALL
            .into_iter()
            .flat_map(|backend| {
                catalog
                    .for_backend(backend)
                    .map(move |strategy| ConversionPair::new(backend, strategy.name()))
            })
            .collect()
    }
}

impl FromStr for ConversionPair {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        let (backend, strategy) = s.split_once(':').ok_or_else(|| ConvertError::Config {
            message: format!("invalid pair {:?}: expected backend:strategy", s),
        })?;
        if strategy.is_empty() {
            return Err(ConvertError::Config {
                message: format!("invalid pair {:?}: missing strategy", s),
            });
        }
        Ok(ConversionPair::new(backend.parse()?, strategy))
    }
}

impl fmt::Display for ConversionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.backend, self.strategy)
    }
}

/// Outcome of one pair.
#[derive(Debug)]
pub struct PairReport {
    /// The requested pair
    pub pair: ConversionPair,
    /// Path written, or why nothing was written
    pub outcome: Result<PathBuf>,
    /// Time spent encoding this pair
    pub elapsed: Duration,
}

impl PairReport {
    /// Check whether the pair produced its output.
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl Serialize for PairReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PairReport", 4)?;
        state.serialize_field("pair", &self.pair.to_string())?;
        match &self.outcome {
            Ok(path) => {
                state.serialize_field("path", path)?;
                state.skip_field("error")?;
            }
            Err(e) => {
                state.skip_field("path")?;
                state.serialize_field("error", &e.to_string())?;
            }
        }
        state.serialize_field("elapsed_ms", &(self.elapsed.as_secs_f64() * 1000.0))?;
        state.end()
    }
}

/// Result of converting one source log.
#[derive(Debug, Serialize)]
pub struct ConversionReport {
    /// The source log
    pub source: PathBuf,
    /// Records parsed
    pub records: usize,
    /// Lines read
    pub lines: usize,
    /// Lines without the sample shape
    pub skipped_lines: usize,
    /// Lines dropped because a number overflowed
    pub line_errors: Vec<LineError>,
    /// One report per requested pair, in request order
    pub pairs: Vec<PairReport>,
    /// Counters for the run
    pub stats: StatsSnapshot,
}

impl ConversionReport {
    /// True only when every requested pair produced its output.
    pub fn all_succeeded(&self) -> bool {
        self.pairs.iter().all(PairReport::succeeded)
    }

    /// Paths of the outputs that were written.
    pub fn written(&self) -> impl Iterator<Item = &Path> + '_ {
        self.pairs.iter().filter_map(|p| p.outcome.as_ref().ok().map(PathBuf::as_path))
    }
}

/// Callback fired as each pair finishes.
pub type ProgressFn<'a> = &'a (dyn Fn(&PairReport) + Sync);

/// Runs conversions for a set of pairs.
///
/// # Examples
///
/// ```no_run
/// use accel_convert::{ConversionDriver, ConversionPair, ConverterConfig};
///
/// let driver = ConversionDriver::new(ConverterConfig::default());
/// let pairs: Vec<ConversionPair> = vec!["flat:none".parse().unwrap()];
/// let report = driver.run("Data/Log.txt", &pairs).unwrap();
/// assert!(report.all_succeeded());
/// ```
#[derive(Clone)]
pub struct ConversionDriver {
    config: ConverterConfig,
    catalog: Arc<CompressionCatalog>,
    store: Arc<dyn StructuredStore>,
}

impl ConversionDriver {
    /// Create a driver with the standard catalog and the default store.
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            catalog: Arc::new(CompressionCatalog::standard().clone()),
            store: default_store(),
        }
    }

    /// Use a custom catalog.
    pub fn with_catalog(mut self, catalog: CompressionCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Use a custom structured store.
    pub fn with_store(mut self, store: Arc<dyn StructuredStore>) -> Self {
        self.store = store;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Get the catalog.
    pub fn catalog(&self) -> &CompressionCatalog {
        &self.catalog
    }

    /// Convert `source` for every pair.
    pub fn run<P: AsRef<Path>>(&self, source: P, pairs: &[ConversionPair]) -> Result<ConversionReport> {
        self.run_inner(source.as_ref(), pairs, None)
    }

    /// Like [`run`](Self::run), calling `progress` as each pair finishes.
    pub fn run_with_progress<P: AsRef<Path>>(
        &self,
        source: P,
        pairs: &[ConversionPair],
        progress: ProgressFn<'_>,
    ) -> Result<ConversionReport> {
        self.run_inner(source.as_ref(), pairs, Some(progress))
    }

    /// Encode an already-built record set for every pair.
    pub fn run_record_set(
        &self,
        set: Arc<RecordSet>,
        base: &OutputBase,
        pairs: &[ConversionPair],
    ) -> Result<Vec<PairReport>> {
        self.config.validate()?;
        let stats = ConversionStats::new();
        self.encode_pairs(&set, base, pairs, None, &stats)
    }

    /// Run [`run`](Self::run) on a blocking thread.
    #[cfg(feature = "async")]
    pub async fn run_async(&self, source: PathBuf, pairs: Vec<ConversionPair>) -> Result<ConversionReport> {
        let driver = self.clone();
        tokio::task::spawn_blocking(move || driver.run(&source, &pairs))
            .await
            .map_err(|e| ConvertError::Io(std::io::Error::other(format!("Task join error: {}", e))))?
    }

    fn run_inner(
        &self,
        source: &Path,
        pairs: &[ConversionPair],
        progress: Option<ProgressFn<'_>>,
    ) -> Result<ConversionReport> {
        self.config.validate()?;

        let parser = LogParser::with_config(self.config.parser);
        let parsed = parser.parse_file(source)?;
        let (lines, skipped_lines) = (parsed.lines(), parsed.skipped());
        let (set, line_errors) = parsed.into_parts()?;
        info!(
            "Parsed {} records from {} ({} lines, {} skipped)",
            set.len(),
            source.display(),
            lines,
            skipped_lines
        );

        let base = OutputBase::from_source(source, self.config.output_dir.as_deref())?;
        if let Some(dir) = &self.config.output_dir {
            fs::create_dir_all(dir).map_err(|e| ConvertError::DestinationWrite {
                path: dir.clone(),
                message: e.to_string(),
            })?;
        }

        let set = Arc::new(set);
        let stats = ConversionStats::new();
        let reports = self.encode_pairs(&set, &base, pairs, progress, &stats)?;

        Ok(ConversionReport {
            source: source.to_path_buf(),
            records: set.len(),
            lines,
            skipped_lines,
            line_errors,
            pairs: reports,
            stats: stats.snapshot(),
        })
    }

    /// Resolve, check and name every pair before any encoding starts.
    fn plan(&self, base: &OutputBase, pairs: &[ConversionPair]) -> Vec<Result<&CompressionStrategy>> {
        let mut seen = HashSet::new();
        pairs
            .iter()
            .map(|pair| {
                let strategy = self.catalog.resolve(&pair.strategy)?;
                if !strategy.supports(pair.backend) {
                    return Err(ConvertError::IncompatibleStrategy {
                        strategy: pair.strategy.clone(),
                        backend: pair.backend,
                    });
                }
                let path = output_path(base, pair.backend, strategy);
                if !seen.insert(path.clone()) {
                    return Err(ConvertError::DuplicateOutput { path });
                }
                Ok(strategy)
            })
            .collect()
    }

    fn encode_pairs(
        &self,
        set: &RecordSet,
        base: &OutputBase,
        pairs: &[ConversionPair],
        progress: Option<ProgressFn<'_>>,
        stats: &ConversionStats,
    ) -> Result<Vec<PairReport>> {
        let encoders = EncoderSet::new(&self.config, Arc::clone(&self.store))?;
        let work: Vec<(&ConversionPair, Result<&CompressionStrategy>)> =
            pairs.iter().zip(self.plan(base, pairs)).collect();
        debug!("Encoding {} pairs", work.len());

        let run_one = |(pair, plan): (&ConversionPair, Result<&CompressionStrategy>)| {
            let started = Instant::now();
            let outcome =
                plan.and_then(|strategy| encoders.get(pair.backend).encode(set, strategy, base));
            let elapsed = started.elapsed();

            match &outcome {
                Ok(path) => {
                    let bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                    stats.record_success(bytes, elapsed);
                    info!("{} -> {} in {:.2?}", pair, path.display(), elapsed);
                }
                Err(e) => {
                    stats.record_failure(elapsed);
                    warn!("{} failed: {}", pair, e);
                }
            }

            let report = PairReport {
                pair: pair.clone(),
                outcome,
                elapsed,
            };
            if let Some(progress) = progress {
                progress(&report);
            }
            report
        };

        #[cfg(feature = "parallel")]
        {
            if self.config.parallelism == 1 {
                return Ok(work.into_iter().map(run_one).collect());
            }
            if self.config.parallelism > 1 {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.parallelism)
                    .build()
                    .map_err(|e| {
                        ConvertError::Io(std::io::Error::other(format!(
                            "Failed to create thread pool: {}",
                            e
                        )))
                    })?;
                return Ok(pool.install(|| work.into_par_iter().map(run_one).collect()));
            }
            Ok(work.into_par_iter().map(run_one).collect())
        }

        #[cfg(not(feature = "parallel"))]
        {
            Ok(work.into_iter().map(run_one).collect())
        }
    }
}
