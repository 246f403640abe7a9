//! The embedding-indexed note store.
//!
//! - [`repository`]: canonical SQLite record store, one database per collection
//! - [`index`]: exact brute-force cosine k-NN over a collection's embeddings
//! - [`store`]: the [`store::NoteStore`] owning every open collection and its locks
//! - [`ingest`] / [`search`]: the async pipelines wrapping the embedding provider
//! - [`service`]: [`service::NoteService`], the injected entry point used by every front end

pub mod index;
pub mod ingest;
pub mod repository;
pub mod search;
pub mod service;
pub mod store;
pub mod types;

/// Encode an embedding as little-endian `f32` bytes for BLOB storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode a BLOB written by [`embedding_to_bytes`]. Returns `None` if the byte
/// length is not a multiple of four.
pub fn bytes_to_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_encoding_is_little_endian() {
        assert_eq!(embedding_to_bytes(&[1.0]), vec![0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(bytes_to_embedding(&[0x00, 0x00, 0x80, 0x3f]), Some(vec![1.0]));
    }

    #[test]
    fn truncated_blob_rejected() {
        assert_eq!(bytes_to_embedding(&[0x00, 0x00, 0x80]), None);
    }
}
