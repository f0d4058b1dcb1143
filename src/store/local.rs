// src/store/local.rs

//! File-backed sample store.
//!
//! Records are stored as raw little-endian `f32` values, row-major, with a
//! fixed number of features per record. Reads go through either buffered
//! I/O or a memory map depending on file size, mirroring the storage
//! configuration thresholds.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use ndarray::{Array2, ArrayView1};

use super::traits::SampleStore;
use crate::config::StorageConfig;
use crate::error::{LoaderError, Result};

/// How a [`FileStore`] reads its backing file.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Buffer size for buffered I/O.
    pub buffer_size: usize,
    /// Whether to use memory-mapped I/O.
    pub use_mmap: bool,
    /// File size threshold (bytes) above which to use mmap.
    pub mmap_threshold: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024,
            use_mmap: true,
            mmap_threshold: 1024 * 1024,
        }
    }
}

impl From<&StorageConfig> for ReadOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            buffer_size: config.buffer_size,
            use_mmap: config.use_mmap,
            mmap_threshold: config.mmap_threshold,
        }
    }
}

enum FileSource {
    Buffered(BufReader<File>),
    Mapped(Mmap),
}

/// A read-only sample store over a raw `f32` record file.
pub struct FileStore {
    path: PathBuf,
    width: usize,
    len: usize,
    source: FileSource,
}

impl FileStore {
    /// Opens a record file of `width` features per record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its size is not a
    /// whole number of records.
    pub fn open(path: impl Into<PathBuf>, width: usize, options: &ReadOptions) -> Result<Self> {
        let path = path.into();
        if width == 0 {
            return Err(LoaderError::config("record width must be greater than 0"));
        }

        let file = File::open(&path)
            .map_err(|e| LoaderError::storage_with_source(&path, "failed to open file", e))?;

        let meta = file.metadata().map_err(|e| {
            LoaderError::storage_with_source(&path, "failed to read file metadata", e)
        })?;
        let size = meta.len();

        let record_bytes = (width * std::mem::size_of::<f32>()) as u64;
        if size % record_bytes != 0 {
            return Err(LoaderError::storage(
                &path,
                format!(
                    "file size {size} is not a whole number of {record_bytes}-byte records"
                ),
            ));
        }
        let len = (size / record_bytes) as usize;

        // Use mmap for large files if enabled
        let source = if options.use_mmap && size >= options.mmap_threshold {
            // SAFETY: The file is opened read-only and we maintain the Mmap
            // for the lifetime of the store.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
                LoaderError::storage_with_source(&path, "failed to memory-map file", e)
            })?;
            FileSource::Mapped(mmap)
        } else {
            FileSource::Buffered(BufReader::with_capacity(options.buffer_size, file))
        };

        Ok(Self {
            path,
            width,
            len,
            source,
        })
    }

    /// Path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleStore for FileStore {
    fn len(&self) -> usize {
        self.len
    }

    fn record_width(&self) -> usize {
        self.width
    }

    fn read_range(&mut self, start: usize, stop: usize) -> Result<Array2<f32>> {
        if start > stop || stop > self.len {
            return Err(LoaderError::out_of_range(start, stop, self.len));
        }

        let record_bytes = self.record_bytes();
        let byte_start = start * record_bytes;
        let byte_len = (stop - start) * record_bytes;

        let bytes = match &mut self.source {
            FileSource::Buffered(reader) => {
                reader
                    .seek(SeekFrom::Start(byte_start as u64))
                    .map_err(|e| {
                        LoaderError::storage_with_source(
                            &self.path,
                            format!("failed to seek to byte {byte_start}"),
                            e,
                        )
                    })?;
                let mut buf = vec![0u8; byte_len];
                reader.read_exact(&mut buf).map_err(|e| {
                    LoaderError::storage_with_source(
                        &self.path,
                        format!("failed to read {byte_len} bytes at byte {byte_start}"),
                        e,
                    )
                })?;
                buf
            }
            FileSource::Mapped(mmap) => mmap[byte_start..byte_start + byte_len].to_vec(),
        };

        decode_records(&bytes, stop - start, self.width)
    }
}

fn decode_records(bytes: &[u8], rows: usize, width: usize) -> Result<Array2<f32>> {
    let mut values = Vec::with_capacity(rows * width);
    for chunk in bytes.chunks_exact(4) {
        values.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Array2::from_shape_vec((rows, width), values)
        .map_err(|e| LoaderError::shape(format!("failed to shape record block: {e}")))
}

/// Appends records to a raw `f32` record file during corpus construction.
///
/// The writer must be [`finish`]ed to guarantee the data reaches disk.
///
/// [`finish`]: FileStoreWriter::finish
pub struct FileStoreWriter {
    path: PathBuf,
    width: usize,
    writer: BufWriter<File>,
    rows_written: usize,
}

impl FileStoreWriter {
    /// Creates (or truncates) a record file for records of `width` features.
    ///
    /// Parent directories are created if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: impl Into<PathBuf>, width: usize, buffer_size: usize) -> Result<Self> {
        let path = path.into();
        if width == 0 {
            return Err(LoaderError::config("record width must be greater than 0"));
        }

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoaderError::storage_with_source(
                        parent,
                        "failed to create parent directories",
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| LoaderError::storage_with_source(&path, "failed to create file", e))?;

        Ok(Self {
            path,
            width,
            writer: BufWriter::with_capacity(buffer_size, file),
            rows_written: 0,
        })
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the row width does not match or the write fails.
    pub fn append_row(&mut self, row: ArrayView1<f32>) -> Result<()> {
        if row.len() != self.width {
            return Err(LoaderError::shape(format!(
                "cannot append row of width {} to store of width {}",
                row.len(),
                self.width
            )));
        }
        for value in row.iter() {
            self.writer.write_all(&value.to_le_bytes()).map_err(|e| {
                LoaderError::storage_with_source(&self.path, "failed to write record", e)
            })?;
        }
        self.rows_written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Finishes the write, ensuring all data is persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush or sync fails.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer
            .flush()
            .map_err(|e| LoaderError::storage_with_source(&self.path, "failed to flush writer", e))?;

        self.writer.get_ref().sync_all().map_err(|e| {
            LoaderError::storage_with_source(&self.path, "failed to sync file to disk", e)
        })?;

        Ok(self.path)
    }
}
