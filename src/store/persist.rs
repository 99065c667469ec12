//! Binary persistence for the vector index.
//!
//! File layout: `vectors.bin`
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA-256 of the embedding model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of the header bytes before this field)
//!
//! Entries (repeated):
//! - id_len: u16, id: UTF-8 bytes
//! - title_len: u32, title: UTF-8 bytes
//! - title_hash: u64
//! - embedding: [f32; dimensions] (little-endian)
//!
//! Saves go through a temp file, fsync, then rename, so an abandoned run
//! never leaves a half-written file behind.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::store::index::{VectorEntry, VectorIndex};

const FORMAT_VERSION: u8 = 1;

/// version(1) + model_id(32) + dimensions(2) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

#[derive(Debug, thiserror::Error)]
pub enum VectorStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid vector file: {0}")]
    InvalidFormat(String),

    #[error("vector file version {0} is newer than supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("vector file was written with a different embedding model")]
    ModelMismatch,

    #[error("vector file checksum mismatch, file may be corrupted")]
    ChecksumMismatch,

    #[error("dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Reads and writes `vectors.bin`.
pub struct VectorStorage {
    path: PathBuf,
}

impl VectorStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the index, validating version, model identity, dimensions and
    /// checksum against the expectations of the current run.
    pub fn load(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<VectorIndex, VectorStorageError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = read_header(&mut reader)?;

        if header.model_id != *expected_model_id {
            return Err(VectorStorageError::ModelMismatch);
        }
        if header.dimensions as usize != expected_dimensions {
            return Err(VectorStorageError::DimensionMismatch {
                expected: expected_dimensions,
                got: header.dimensions as usize,
            });
        }

        let mut index =
            VectorIndex::with_capacity(header.dimensions as usize, header.entry_count as usize);

        for _ in 0..header.entry_count {
            let (id, entry) = read_entry(&mut reader, header.dimensions as usize)?;
            // Entries that fail validation (e.g. zero norm) are dropped
            // rather than aborting the load
            let _ = index.upsert(&id, &entry.title, entry.title_hash, entry.embedding);
        }

        Ok(index)
    }

    /// Save the index atomically: temp file, fsync, rename.
    pub fn save(
        &self,
        index: &VectorIndex,
        model_id: &[u8; 32],
    ) -> Result<(), VectorStorageError> {
        let temp_path = self.path.with_extension("tmp");

        let result = write_to_file(&temp_path, index, model_id);
        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }

        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

struct Header {
    model_id: [u8; 32],
    dimensions: u16,
    entry_count: u64,
}

fn read_header(reader: &mut BufReader<File>) -> Result<Header, VectorStorageError> {
    let mut bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut bytes)?;

    let version = bytes[0];
    if version > FORMAT_VERSION {
        return Err(VectorStorageError::VersionMismatch(version, FORMAT_VERSION));
    }

    let mut model_id = [0u8; 32];
    model_id.copy_from_slice(&bytes[1..33]);

    let dimensions = u16::from_le_bytes([bytes[33], bytes[34]]);
    let entry_count = u64::from_le_bytes([
        bytes[35], bytes[36], bytes[37], bytes[38], bytes[39], bytes[40], bytes[41], bytes[42],
    ]);
    let stored_checksum = u32::from_le_bytes([bytes[43], bytes[44], bytes[45], bytes[46]]);

    if stored_checksum != crc32fast::hash(&bytes[0..43]) {
        return Err(VectorStorageError::ChecksumMismatch);
    }

    Ok(Header {
        model_id,
        dimensions,
        entry_count,
    })
}

fn write_to_file(
    path: &Path,
    index: &VectorIndex,
    model_id: &[u8; 32],
) -> Result<(), VectorStorageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let mut header = [0u8; HEADER_SIZE];
    header[0] = FORMAT_VERSION;
    header[1..33].copy_from_slice(model_id);
    header[33..35].copy_from_slice(&(index.dimensions() as u16).to_le_bytes());
    header[35..43].copy_from_slice(&(index.len() as u64).to_le_bytes());
    let checksum = crc32fast::hash(&header[0..43]);
    header[43..47].copy_from_slice(&checksum.to_le_bytes());
    writer.write_all(&header)?;

    for (id, entry) in index.iter() {
        write_entry(&mut writer, id, entry)?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    Ok(())
}

fn write_entry(
    writer: &mut BufWriter<File>,
    id: &str,
    entry: &VectorEntry,
) -> Result<(), VectorStorageError> {
    let id_bytes = id.as_bytes();
    if id_bytes.len() > u16::MAX as usize {
        return Err(VectorStorageError::InvalidFormat(format!(
            "article id too long ({} bytes)",
            id_bytes.len()
        )));
    }
    writer.write_all(&(id_bytes.len() as u16).to_le_bytes())?;
    writer.write_all(id_bytes)?;

    let title_bytes = entry.title.as_bytes();
    writer.write_all(&(title_bytes.len() as u32).to_le_bytes())?;
    writer.write_all(title_bytes)?;

    writer.write_all(&entry.title_hash.to_le_bytes())?;

    for &value in &entry.embedding {
        writer.write_all(&value.to_le_bytes())?;
    }

    Ok(())
}

fn read_entry(
    reader: &mut BufReader<File>,
    dimensions: usize,
) -> Result<(String, VectorEntry), VectorStorageError> {
    let id_len = read_u16(reader)? as usize;
    let id = read_string(reader, id_len)?;

    let title_len = read_u32(reader)? as usize;
    let title = read_string(reader, title_len)?;

    let mut hash_bytes = [0u8; 8];
    reader.read_exact(&mut hash_bytes)?;
    let title_hash = u64::from_le_bytes(hash_bytes);

    let mut embedding = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        let mut float_bytes = [0u8; 4];
        reader.read_exact(&mut float_bytes)?;
        embedding.push(f32::from_le_bytes(float_bytes));
    }

    Ok((
        id,
        VectorEntry {
            title_hash,
            title,
            embedding,
        },
    ))
}

fn read_u16(reader: &mut BufReader<File>) -> Result<u16, VectorStorageError> {
    let mut bytes = [0u8; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}

fn read_u32(reader: &mut BufReader<File>) -> Result<u32, VectorStorageError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_string(
    reader: &mut BufReader<File>,
    len: usize,
) -> Result<String, VectorStorageError> {
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|e| VectorStorageError::InvalidFormat(format!("non-UTF-8 string field: {e}")))
}
