pub mod azure_blob;
pub mod azure_speech;
pub mod openai;
pub mod tokens;

pub use azure_blob::AzureBlobStorage;
pub use azure_speech::AzureSpeechBackend;
pub use openai::{OpenAiChatModel, OpenAiWhisper};
pub use tokens::ApproxTokenCounter;
#[cfg(feature = "hf-tokenizer")]
pub use tokens::HfTokenCounter;
