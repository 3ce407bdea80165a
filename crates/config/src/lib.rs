pub mod settings;

pub use settings::{
    LanguageModelSettings, PipelineSettings, Settings, SpeechSettings, StorageSettings,
};
