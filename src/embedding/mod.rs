// Term embedding — trait, local ONNX implementation, model download.

pub mod download;
pub mod onnx;
pub mod traits;

pub use onnx::{SentenceEmbedder, EMBEDDING_DIM};
pub use traits::TermEmbedder;
