//! Deterministic reference embedding provider.
//!
//! Hashes `(text, dimension)` into a seed and expands it into a unit vector
//! via a seeded PRNG. This stands in for a real model host: it satisfies the
//! provider contract (deterministic, unit-norm, dimension-parameterized)
//! without requiring network access or a model runtime, the same role the
//! teacher's `embeddings/local.rs` plays for fastembed before the optional
//! feature is compiled in.

use super::{l2_normalize, Dimension, Embedding, EmbeddingProvider};
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub struct DeterministicEmbeddingProvider {
    d_route: usize,
    d_full: usize,
}

impl DeterministicEmbeddingProvider {
    pub fn new(cfg: &Config) -> Self {
        Self {
            d_route: cfg.d_route,
            d_full: cfg.d_full,
        }
    }
}

fn seed_for(text: &str, dim: Dimension) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    match dim {
        Dimension::Route => "route".hash(&mut hasher),
        Dimension::Full => "full".hash(&mut hasher),
    }
    hasher.finish()
}

#[async_trait]
impl EmbeddingProvider for DeterministicEmbeddingProvider {
    async fn embed(&self, text: &str, dim: Dimension) -> Result<Embedding> {
        let size = match dim {
            Dimension::Route => self.d_route,
            Dimension::Full => self.d_full,
        };
        let mut rng = StdRng::seed_from_u64(seed_for(text, dim));
        let mut v: Embedding = (0..size).map(|_| rng.gen_range(-1.0f32..1.0f32)).collect();
        l2_normalize(&mut v);
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config::default()
    }

    #[tokio::test]
    async fn same_text_and_dimension_is_deterministic() {
        let p = DeterministicEmbeddingProvider::new(&cfg());
        let a = p.embed("hello world", Dimension::Full).await.unwrap();
        let b = p.embed("hello world", Dimension::Full).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_dimension_changes_output_and_size() {
        let p = DeterministicEmbeddingProvider::new(&cfg());
        let route = p.embed("hello world", Dimension::Route).await.unwrap();
        let full = p.embed("hello world", Dimension::Full).await.unwrap();
        assert_eq!(route.len(), 512);
        assert_eq!(full.len(), 1536);
        assert_ne!(route.len(), full.len());
    }

    #[tokio::test]
    async fn output_is_unit_norm() {
        let p = DeterministicEmbeddingProvider::new(&cfg());
        let v = p.embed("some content", Dimension::Full).await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn different_text_changes_output() {
        let p = DeterministicEmbeddingProvider::new(&cfg());
        let a = p.embed("alpha", Dimension::Full).await.unwrap();
        let b = p.embed("beta", Dimension::Full).await.unwrap();
        assert_ne!(a, b);
    }
}
