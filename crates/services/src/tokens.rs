use diascribe_transcription::TokenCounter;

/// Character-based estimate: one token per four characters, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

#[cfg(feature = "hf-tokenizer")]
pub use hf::HfTokenCounter;

#[cfg(feature = "hf-tokenizer")]
mod hf {
    use std::path::Path;

    use anyhow::anyhow;
    use diascribe_transcription::TokenCounter;
    use tokenizers::Tokenizer;
    use tracing::warn;

    /// Exact counts from a `tokenizer.json` vocabulary.
    pub struct HfTokenCounter {
        tokenizer: Tokenizer,
    }

    impl HfTokenCounter {
        pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
            let tokenizer = Tokenizer::from_file(path.as_ref())
                .map_err(|e| anyhow!("Failed to load tokenizer {}: {}", path.as_ref().display(), e))?;
            Ok(Self { tokenizer })
        }
    }

    impl TokenCounter for HfTokenCounter {
        fn count_tokens(&self, text: &str) -> usize {
            match self.tokenizer.encode(text, false) {
                Ok(encoding) => encoding.len(),
                Err(e) => {
                    warn!(error = %e, "Tokenizer failed, falling back to estimate");
                    text.chars().count().div_ceil(4)
                }
            }
        }
    }
}
