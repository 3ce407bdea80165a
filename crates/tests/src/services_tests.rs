use std::sync::Arc;

use diascribe_cli::{build_engine, transcription_config};
use diascribe_config::Settings;
use diascribe_services::{ApproxTokenCounter, AzureBlobStorage};
use diascribe_transcription::TranscriptionEngine;
use tokio_util::sync::CancellationToken;

use crate::fixtures::seed::short_call;
use crate::fixtures::test_app::{EchoModel, ScriptedSpeech};

#[tokio::test]
async fn unreachable_blob_store_is_an_upload_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = short_call(dir.path());
    let speech = Arc::new(ScriptedSpeech::default());

    let engine = TranscriptionEngine::new(
        Arc::new(AzureBlobStorage::new("http://127.0.0.1:9".into(), Some("sig=x".into()))),
        speech.clone(),
        Arc::new(EchoModel::default()),
        Arc::new(ApproxTokenCounter),
        Default::default(),
    );

    let err = engine
        .transcribe_file(&path, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "UploadFailure");
    assert!(speech.submitted.lock().unwrap().is_empty());
}

#[test]
fn engine_builds_from_default_settings() {
    let settings = Settings::load().unwrap();
    let config = transcription_config(&settings, None, None);
    assert_eq!(config.container_prefix, "diascribe");
    assert!(build_engine(&settings, config).is_ok());
}
