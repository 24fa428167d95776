//! HDF5 store backed by `hdf5-metno`.

use std::mem::{offset_of, size_of};
use std::path::Path;

use hdf5::filters::{Filter, SZip};
use hdf5::types::{CompoundField, CompoundType, H5Type, TypeDescriptor, VarLenUnicode};
use hdf5::{Dataset, File, Group, Location};
use log::debug;

use crate::compression::{Codec, FilterPipeline, SzipCoding};
use crate::error::{ConvertError, Result};
use crate::store::{NarrowRow, RowBlock, Staging, StructuredStore, TableSpec, WideRow, WideTickedRow};

const STORE: &str = "hdf5";
const CHUNK_ROWS: usize = 16 * 1024;
const TABLE_VERSION: &str = "2.7";

fn compound<T>(fields: Vec<(&str, TypeDescriptor, usize)>) -> TypeDescriptor {
    TypeDescriptor::Compound(CompoundType {
        fields: fields
            .into_iter()
            .enumerate()
            .map(|(index, (name, ty, offset))| CompoundField {
                name: name.to_string(),
                ty,
                offset,
                index,
            })
            .collect(),
        size: size_of::<T>(),
    })
}

unsafe impl H5Type for WideTickedRow {
    fn type_descriptor() -> TypeDescriptor {
        compound::<Self>(vec![
            ("millisecond", i32::type_descriptor(), offset_of!(WideTickedRow, millisecond)),
            ("counter", i32::type_descriptor(), offset_of!(WideTickedRow, counter)),
            ("timestamp", f64::type_descriptor(), offset_of!(WideTickedRow, timestamp)),
            ("acceleration", i32::type_descriptor(), offset_of!(WideTickedRow, acceleration)),
        ])
    }
}

unsafe impl H5Type for WideRow {
    fn type_descriptor() -> TypeDescriptor {
        compound::<Self>(vec![
            ("counter", i32::type_descriptor(), offset_of!(WideRow, counter)),
            ("timestamp", f64::type_descriptor(), offset_of!(WideRow, timestamp)),
            ("acceleration", i32::type_descriptor(), offset_of!(WideRow, acceleration)),
        ])
    }
}

unsafe impl H5Type for NarrowRow {
    fn type_descriptor() -> TypeDescriptor {
        compound::<Self>(vec![
            ("counter", u8::type_descriptor(), offset_of!(NarrowRow, counter)),
            ("timestamp", u64::type_descriptor(), offset_of!(NarrowRow, timestamp)),
            ("acceleration", u16::type_descriptor(), offset_of!(NarrowRow, acceleration)),
        ])
    }
}

fn store_error(e: hdf5::Error) -> ConvertError {
    ConvertError::Store {
        store: STORE,
        message: e.to_string(),
    }
}

/// Translate a pipeline into HDF5 filters: shuffle, codec, checksum.
fn filters(pipeline: &FilterPipeline) -> Vec<Filter> {
    let mut filters = Vec::with_capacity(3);
    if pipeline.shuffle {
        filters.push(Filter::Shuffle);
    }
    match pipeline.codec {
        Some(Codec::Deflate { level }) => filters.push(Filter::Deflate(level)),
        Some(Codec::Szip { coding, pixels_per_block }) => {
            let coding = match coding {
                SzipCoding::NearestNeighbor => SZip::NearestNeighbor,
                SzipCoding::Entropy => SZip::Entropy,
            };
            filters.push(Filter::SZip(coding, pixels_per_block));
        }
        Some(codec) => {
            if let Some((id, cdata)) = codec.plugin() {
                filters.push(Filter::User(id as _, cdata));
            }
        }
        None => {}
    }
    if pipeline.fletcher32 {
        filters.push(Filter::Fletcher32);
    }
    filters
}

fn create_dataset<T: H5Type>(
    group: &Group,
    name: &str,
    rows: &[T],
    filters: &[Filter],
) -> hdf5::Result<Dataset> {
    if rows.is_empty() {
        group
            .new_dataset::<T>()
            .shape(0..)
            .chunk(1)
            .set_filters(filters)
            .create(name)
    } else if filters.is_empty() {
        group.new_dataset_builder().with_data(rows).create(name)
    } else {
        group
            .new_dataset_builder()
            .with_data(rows)
            .chunk(rows.len().min(CHUNK_ROWS))
            .set_filters(filters)
            .create(name)
    }
}

fn append_table<T: H5Type>(
    group: &Group,
    table: &TableSpec,
    rows: &[T],
    filters: &[Filter],
) -> hdf5::Result<Dataset> {
    let batch = table.batch_rows.max(1);
    let dataset = group
        .new_dataset::<T>()
        .shape(0..)
        .chunk(batch)
        .set_filters(filters)
        .create(table.name.as_str())?;

    for (i, chunk) in rows.chunks(batch).enumerate() {
        let start = i * batch;
        let end = start + chunk.len();
        dataset.resize(end)?;
        dataset.write_slice(chunk, start..end)?;
    }
    Ok(dataset)
}

fn write_text_attr(location: &Location, name: &str, value: &str) -> Result<()> {
    let value: VarLenUnicode = value.parse().map_err(|e| ConvertError::Store {
        store: STORE,
        message: format!("invalid attribute {}: {}", name, e),
    })?;
    location
        .new_attr::<VarLenUnicode>()
        .create(name)
        .and_then(|attr| attr.write_scalar(&value))
        .map_err(store_error)
}

fn open_group(file: &File, group: &str) -> hdf5::Result<Group> {
    let path = group.trim_matches('/');
    if path.is_empty() {
        return file.group("/");
    }
    file.group(path).or_else(|_| file.create_group(path))
}

/// A [`StructuredStore`] writing HDF5 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5Store;

impl Hdf5Store {
    /// Create the store.
    pub fn new() -> Self {
        Self
    }
}

impl Staging for Hdf5Store {}

impl StructuredStore for Hdf5Store {
    fn name(&self) -> &'static str {
        STORE
    }

    fn write_dataset(
        &self,
        path: &Path,
        name: &str,
        block: &RowBlock,
        pipeline: &FilterPipeline,
    ) -> Result<()> {
        let file = File::create(path).map_err(store_error)?;
        let filters = filters(pipeline);
        debug!("Creating dataset {} in {} with {}", name, path.display(), pipeline);

        match block {
            RowBlock::WideTicked(rows) => create_dataset(&file, name, rows, &filters),
            RowBlock::Wide(rows) => create_dataset(&file, name, rows, &filters),
            RowBlock::Narrow(rows) => create_dataset(&file, name, rows, &filters),
        }
        .map_err(store_error)?;

        file.close().map_err(store_error)
    }

    fn write_table(
        &self,
        path: &Path,
        table: &TableSpec,
        block: &RowBlock,
        pipeline: &FilterPipeline,
    ) -> Result<()> {
        let file = File::create(path).map_err(store_error)?;
        let group = open_group(&file, &table.group).map_err(store_error)?;
        let filters = filters(pipeline);
        debug!(
            "Creating table {}{} in {} with {}",
            table.group,
            table.name,
            path.display(),
            pipeline
        );

        let dataset = match block {
            RowBlock::WideTicked(rows) => append_table(&group, table, rows, &filters),
            RowBlock::Wide(rows) => append_table(&group, table, rows, &filters),
            RowBlock::Narrow(rows) => append_table(&group, table, rows, &filters),
        }
        .map_err(store_error)?;

        write_text_attr(&dataset, "CLASS", "TABLE")?;
        write_text_attr(&dataset, "VERSION", TABLE_VERSION)?;
        write_text_attr(&dataset, "TITLE", &table.title)?;
        for (i, column) in block.schema().iter().enumerate() {
            write_text_attr(&dataset, &format!("FIELD_{}_NAME", i), column.name)?;
        }

        drop(dataset);
        drop(group);
        file.close().map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_order() {
        let pipeline = FilterPipeline {
            shuffle: true,
            codec: Some(Codec::Deflate { level: 9 }),
            fletcher32: true,
        };
        let filters = filters(&pipeline);
        assert_eq!(filters, vec![Filter::Shuffle, Filter::Deflate(9), Filter::Fletcher32]);
    }

    #[test]
    fn test_plugin_filter() {
        let pipeline = FilterPipeline {
            shuffle: false,
            codec: Some(Codec::Zstd { level: 3 }),
            fletcher32: false,
        };
        assert_eq!(filters(&pipeline), vec![Filter::User(32015, vec![3])]);
    }

    #[test]
    fn test_compound_sizes() {
        match NarrowRow::type_descriptor() {
            TypeDescriptor::Compound(compound) => {
                assert_eq!(compound.fields.len(), 3);
                assert_eq!(compound.size, size_of::<NarrowRow>());
            }
            other => panic!("unexpected descriptor {:?}", other),
        }
    }
}
