//! Round trips through real HDF5 files.
//!
//! Needs the HDF5 C library; run with `--features hdf5`.

#![cfg(feature = "hdf5")]

use std::fs;
use std::path::PathBuf;

use accel_convert::store::{NarrowRow, WideRow, WideTickedRow};
use accel_convert::{ConversionDriver, ConversionPair, ConverterConfig, LogDialect, ParserConfig};
use hdf5::types::VarLenUnicode;
use tempfile::{tempdir, TempDir};

const SCENARIO: &str = "[I] (12ms) 3 4.567 89;\nnot a log line\n[I] (13ms) 4 5.0 90;\n";

fn convert(contents: &str, specs: &[&str]) -> (TempDir, Vec<PathBuf>) {
    convert_with(ConverterConfig::default(), contents, specs)
}

fn convert_with(
    config: ConverterConfig,
    contents: &str,
    specs: &[&str],
) -> (TempDir, Vec<PathBuf>) {
    let dir = tempdir().unwrap();
    let log = dir.path().join("Log.txt");
    fs::write(&log, contents).unwrap();

    let pairs: Vec<ConversionPair> = specs.iter().map(|s| s.parse().unwrap()).collect();
    let report = ConversionDriver::new(config).run(&log, &pairs).unwrap();
    for pair in &report.pairs {
        if let Err(e) = &pair.outcome {
            panic!("{} failed: {}", pair.pair, e);
        }
    }
    let written = report.written().map(|p| p.to_path_buf()).collect();
    (dir, written)
}

#[test]
fn test_columnar_round_trip() {
    let (_dir, written) = convert(SCENARIO, &["columnar:none", "columnar:gzip"]);

    for path in written {
        let file = hdf5::File::open(&path).unwrap();
        let rows = file.dataset("acceleration").unwrap().read_raw::<WideTickedRow>().unwrap();
        assert_eq!(
            rows,
            vec![
                WideTickedRow { millisecond: 12, counter: 3, timestamp: 4.567, acceleration: 89 },
                WideTickedRow { millisecond: 13, counter: 4, timestamp: 5.0, acceleration: 90 },
            ]
        );
    }
}

#[test]
fn test_columnar_plain_layout() {
    let config = ConverterConfig::default()
        .with_parser(ParserConfig::new().with_dialect(LogDialect::Plain));
    let (_dir, written) = convert_with(config, "[I] 7 1.5 3;\n", &["columnar:none"]);
    assert_eq!(written.len(), 1);

    let file = hdf5::File::open(&written[0]).unwrap();
    let rows = file.dataset("acceleration").unwrap().read_raw::<WideRow>().unwrap();
    assert_eq!(rows, vec![WideRow { counter: 7, timestamp: 1.5, acceleration: 3 }]);
}

#[test]
fn test_row_table_round_trip() {
    let (_dir, written) = convert(SCENARIO, &["table:none", "table:zlib"]);

    for path in written {
        let file = hdf5::File::open(&path).unwrap();
        let dataset = file.dataset("acceleration").unwrap();
        let rows = dataset.read_raw::<NarrowRow>().unwrap();
        assert_eq!(
            rows,
            vec![
                NarrowRow { counter: 3, timestamp: 4567, acceleration: 89 },
                NarrowRow { counter: 4, timestamp: 5000, acceleration: 90 },
            ]
        );

        let class: VarLenUnicode = dataset.attr("CLASS").unwrap().read_scalar().unwrap();
        assert_eq!(class.as_str(), "TABLE");
        let first: VarLenUnicode = dataset.attr("FIELD_0_NAME").unwrap().read_scalar().unwrap();
        assert_eq!(first.as_str(), "counter");
    }
}

#[test]
fn test_compressed_dataset_reports_filters() {
    let (_dir, written) = convert(SCENARIO, &["columnar:gzip"]);

    let file = hdf5::File::open(&written[0]).unwrap();
    let filters = file.dataset("acceleration").unwrap().filters();
    assert!(filters.iter().any(|f| matches!(f, hdf5::filters::Filter::Deflate(_))));
}

#[test]
fn test_empty_input_creates_empty_datasets() {
    let (_dir, written) = convert("", &["columnar:none", "table:none"]);

    for path in written {
        let file = hdf5::File::open(&path).unwrap();
        assert_eq!(file.dataset("acceleration").unwrap().size(), 0);
    }
}
