use tiktoken_rs::CoreBPE;

use crate::errors::ClientError;

/// Counts tokens in committed reply text.
pub trait TokenCounter: Send + Sync {
    /// Returns the number of tokens in `text`.
    fn count(&self, text: &str) -> usize;
}

/// `TokenCounter` backed by a tiktoken BPE encoding.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Loads the encoding used by `model` (for example `gpt-4`).
    pub fn for_model(model: &str) -> Result<Self, ClientError> {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .map_err(|e| ClientError::Tokenizer(format!("no encoding for model {model}: {e}")))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}
