// Lexfold: semantic grouping of vocabulary terms for frequency analysis.
//
// This is the library root. Each module corresponds to one stage of the
// term aggregation pipeline: counting, embedding, clustering, aggregation.

pub mod aggregate;
pub mod cluster;
pub mod config;
pub mod embedding;
pub mod output;
pub mod vectorizer;
