// Storage module
// On-disk persistence of the vector index and its aligned chunk metadata


use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::embeddings::chunking::Chunk;
use crate::index::VectorIndex;
use crate::{HandbookError, Result};

const VECTORS_FILE: &str = "vectors.bin";
const CHUNKS_FILE: &str = "chunks.json";
const MODEL_FILE: &str = "model_name.txt";

const MAGIC: &[u8; 4] = b"HBVI";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 8 + 8;

/// A vector index together with the chunks its rows belong to.
///
/// Row `i` of the index is the embedding of `chunks[i]`, and `chunks[i].id`
/// is `i`. Both halves are built together and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    chunks: Vec<Chunk>,
    index: VectorIndex,
    model: String,
}

impl KnowledgeBase {
    #[inline]
    pub fn new(chunks: Vec<Chunk>, index: VectorIndex, model: impl Into<String>) -> Result<Self> {
        if chunks.len() != index.len() {
            return Err(HandbookError::Storage(format!(
                "index has {} rows but there are {} chunks",
                index.len(),
                chunks.len()
            )));
        }

        if let Some((position, chunk)) = chunks
            .iter()
            .enumerate()
            .find(|(position, chunk)| chunk.id != *position)
        {
            return Err(HandbookError::Storage(format!(
                "chunk at position {} has id {}",
                position, chunk.id
            )));
        }

        Ok(Self {
            chunks,
            index,
            model: model.into(),
        })
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[inline]
    pub fn chunk(&self, position: usize) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Identifier of the embedding model that produced the vectors
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Directory holding one persisted knowledge base
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    #[inline]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether every persisted file is present
    #[inline]
    pub fn exists(&self) -> bool {
        self.vectors_path().is_file() && self.chunks_path().is_file() && self.model_path().is_file()
    }

    /// Persist the index, its chunks and the model id, replacing any previous build.
    ///
    /// The three files are written into a sibling staging directory which is
    /// then swapped in for the live one, so a failed save leaves the previous
    /// build loadable and never mixes files from two builds.
    #[inline]
    pub fn save(&self, knowledge: &KnowledgeBase) -> Result<()> {
        let staging = self.sibling("staging");
        if let Err(e) = write_build(&staging, knowledge) {
            discard_dir(&staging);
            return Err(e);
        }

        let previous = self.sibling("previous");
        let had_previous = self.dir.is_dir();
        if had_previous {
            discard_dir(&previous);
            if let Err(e) = fs::rename(&self.dir, &previous) {
                discard_dir(&staging);
                return Err(HandbookError::Storage(format!(
                    "Failed to move aside index directory {}: {}",
                    self.dir.display(),
                    e
                )));
            }
        }

        if let Err(e) = fs::rename(&staging, &self.dir) {
            if had_previous && fs::rename(&previous, &self.dir).is_err() {
                warn!(
                    "Previous index left in {} after a failed save",
                    previous.display()
                );
            }
            discard_dir(&staging);
            return Err(HandbookError::Storage(format!(
                "Failed to move new index into {}: {}",
                self.dir.display(),
                e
            )));
        }

        if had_previous {
            discard_dir(&previous);
        }

        info!(
            "Saved {} vectors of dimension {} to {}",
            knowledge.len(),
            knowledge.dimension(),
            self.dir.display()
        );
        Ok(())
    }

    /// Load a knowledge base and check it matches the active embedding model.
    ///
    /// A missing build, a different model or a different dimension are
    /// configuration errors: the index has to be rebuilt before it can serve
    /// queries.
    #[inline]
    pub fn load(&self, expected_model: &str, expected_dimension: usize) -> Result<KnowledgeBase> {
        let knowledge = self.load_unchecked()?;

        if knowledge.model() != expected_model {
            return Err(HandbookError::Config(format!(
                "index was built with model '{}' but the configured model is '{}'; re-run ingestion",
                knowledge.model(),
                expected_model
            )));
        }

        if knowledge.dimension() != expected_dimension {
            return Err(HandbookError::Config(format!(
                "index has embedding dimension {} but the configured model produces {}; re-run ingestion",
                knowledge.dimension(),
                expected_dimension
            )));
        }

        Ok(knowledge)
    }

    /// Load a knowledge base without checking it against a model
    #[inline]
    pub fn load_unchecked(&self) -> Result<KnowledgeBase> {
        if !self.exists() {
            return Err(HandbookError::Config(format!(
                "no index found in {}; run ingestion first",
                self.dir.display()
            )));
        }

        debug!("Loading index from {}", self.dir.display());

        let index = decode_vectors(&fs::read(self.vectors_path())?)?;

        let chunks_json = fs::read_to_string(self.chunks_path())?;
        let chunks: Vec<Chunk> = serde_json::from_str(&chunks_json)
            .map_err(|e| HandbookError::Storage(format!("Failed to parse chunks: {}", e)))?;

        let model = fs::read_to_string(self.model_path())?.trim().to_string();

        let knowledge = KnowledgeBase::new(chunks, index, model)?;
        info!(
            "Loaded {} chunks (dimension {}, model {})",
            knowledge.len(),
            knowledge.dimension(),
            knowledge.model()
        );
        Ok(knowledge)
    }

    /// `<dir>.<suffix>` next to the live directory
    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .dir
            .file_name()
            .map_or_else(|| "index".into(), |name| name.to_string_lossy());
        self.dir.with_file_name(format!("{}.{}", name, suffix))
    }

    fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    fn chunks_path(&self) -> PathBuf {
        self.dir.join(CHUNKS_FILE)
    }

    fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }
}

fn write_build(dir: &Path, knowledge: &KnowledgeBase) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        HandbookError::Storage(format!(
            "Failed to create index directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    fs::write(dir.join(VECTORS_FILE), encode_vectors(knowledge.index()))?;

    let chunks_json = serde_json::to_string_pretty(knowledge.chunks())
        .map_err(|e| HandbookError::Storage(format!("Failed to serialize chunks: {}", e)))?;
    fs::write(dir.join(CHUNKS_FILE), chunks_json)?;

    fs::write(dir.join(MODEL_FILE), knowledge.model())?;

    Ok(())
}

fn discard_dir(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            warn!("Failed to remove {}: {}", dir.display(), e);
        }
        _ => {}
    }
}

fn encode_vectors(index: &VectorIndex) -> Vec<u8> {
    let values = index.as_slice();
    let mut bytes = Vec::with_capacity(HEADER_LEN + std::mem::size_of_val(values));

    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&(index.dimension() as u64).to_le_bytes());
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    bytes
}

fn decode_vectors(bytes: &[u8]) -> Result<VectorIndex> {
    let Some((header, body)) = bytes.split_at_checked(HEADER_LEN) else {
        return Err(HandbookError::Storage(
            "vector file is shorter than its header".to_string(),
        ));
    };

    if &header[0..4] != MAGIC {
        return Err(HandbookError::Storage(
            "vector file has an unknown format".to_string(),
        ));
    }

    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != FORMAT_VERSION {
        return Err(HandbookError::Storage(format!(
            "unsupported vector file version {}",
            version
        )));
    }

    let rows = read_u64(&header[8..16]);
    let dimension = read_u64(&header[16..24]);

    let expected_len = rows
        .checked_mul(dimension)
        .and_then(|values| values.checked_mul(4))
        .and_then(|len| usize::try_from(len).ok())
        .ok_or_else(|| HandbookError::Storage("vector file header is corrupt".to_string()))?;

    if body.len() != expected_len {
        return Err(HandbookError::Storage(format!(
            "vector file holds {} bytes of data, header promises {}",
            body.len(),
            expected_len
        )));
    }

    let dimension = usize::try_from(dimension)
        .map_err(|_| HandbookError::Storage("vector dimension out of range".to_string()))?;

    let data = body
        .chunks_exact(4)
        .map(|value| f32::from_le_bytes([value[0], value[1], value[2], value[3]]))
        .collect::<Vec<_>>();

    VectorIndex::from_normalized(dimension, data)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buffer = [0u8; 8];
    buffer.copy_from_slice(bytes);
    u64::from_le_bytes(buffer)
}
