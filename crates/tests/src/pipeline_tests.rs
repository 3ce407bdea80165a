use diascribe_transcription::{AudioAsset, TranscriptionError, splitter};
use tokio_util::sync::CancellationToken;

use crate::fixtures::seed::{long_call, phrases, short_call};
use crate::fixtures::test_app::{EchoModel, MemoryStorage, ScriptedSpeech, TestApp};

fn long_call_script() -> ScriptedSpeech {
    ScriptedSpeech::with_script(vec![
        (
            "long_call_chunk1.wav",
            phrases(&[("1", "Добрий день."), ("2", "Привіт."), ("2", "Як ви?")]),
        ),
        (
            "long_call_chunk2.wav",
            phrases(&[("1", "Чудово."), ("2", "Продовжимо.")]),
        ),
        ("long_call_chunk3.wav", phrases(&[("3", "Я теж тут.")])),
    ])
}

#[tokio::test]
async fn long_recording_is_split_transcribed_and_relabeled() {
    // Backend numbers speakers per chunk; in chunk 2 its "1" is our "2".
    let app = TestApp::new(
        MemoryStorage::default(),
        long_call_script(),
        EchoModel::swapping(1, "Speaker 1", "Speaker 2"),
    );
    let path = long_call(app.dir.path());
    let engine = app.engine(app.config(5_000_000));

    let transcript = engine
        .transcribe_file(&path, &CancellationToken::new())
        .await
        .unwrap();

    // One container, three uploads, one job with sources in chunk order.
    assert_eq!(app.storage.containers.lock().unwrap().len(), 1);
    assert_eq!(app.storage.blobs.lock().unwrap().len(), 3);
    let submitted = app.speech.submitted.lock().unwrap().clone();
    assert_eq!(submitted.len(), 3);
    for (i, url) in submitted.iter().enumerate() {
        assert!(url.ends_with(&format!("long_call_chunk{}.wav", i + 1)), "{}", url);
    }

    let rendered: Vec<_> = transcript
        .entries
        .iter()
        .map(|e| (e.chunk_index, e.speaker.as_str(), e.text.as_str()))
        .collect();
    assert_eq!(
        rendered,
        vec![
            (0, "Speaker 1", "Добрий день."),
            (0, "Speaker 2", "Привіт. Як ви?"),
            (1, "Speaker 2", "Чудово."),
            (1, "Speaker 1", "Продовжимо."),
            (2, "Speaker 3", "Я теж тут."),
        ]
    );
    assert_eq!(transcript.speakers, vec!["Speaker 1", "Speaker 2", "Speaker 3"]);

    // Each prompt carries the previous chunk's reconciled lines.
    let prompts = app.model.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("Previous context:\n\n\nCurrent text:\nSpeaker 1: Добрий день."));
    assert!(prompts[1].contains("Previous context:\nSpeaker 1: Добрий день.\nSpeaker 2: Привіт. Як ви?\n"));
    assert!(prompts[2].contains("Previous context:\nSpeaker 2: Чудово.\nSpeaker 1: Продовжимо.\n"));

    // The staging container is removed once the job is done.
    assert_eq!(
        *app.storage.deleted.lock().unwrap(),
        *app.storage.containers.lock().unwrap()
    );

    // One audit file per transcription result.
    let audits = std::fs::read_dir(app.dir.path().join("transcripts")).unwrap().count();
    assert_eq!(audits, 3);
}

#[tokio::test]
async fn chunk_bytes_and_durations_follow_the_plan() {
    let dir = tempfile::tempdir().unwrap();
    let path = long_call(dir.path());
    let asset = AudioAsset::load(&path).await.unwrap();
    assert_eq!(asset.byte_size(), 11_880_044);
    assert_eq!(asset.duration_ms, 90_000);

    let chunks = tokio::task::spawn_blocking(move || splitter::split(asset, 5_000_000))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(chunks.len(), 3);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
        assert_eq!(chunk.duration_ms(), 30_000);
        assert!(chunk.byte_size() <= 5_000_000);
    }

    let written = splitter::write_chunks(dir.path(), &chunks).await.unwrap();
    assert_eq!(written.len(), 3);
    assert!(written[0].ends_with("long_call_chunks/long_call_chunk1.wav"));
}

#[tokio::test]
async fn small_recording_is_sent_whole() {
    let app = TestApp::new(
        MemoryStorage::default(),
        ScriptedSpeech::with_script(vec![(
            "short_call.wav",
            phrases(&[("1", "Hello."), ("2", "Hi there.")]),
        )]),
        EchoModel::default(),
    );
    let path = short_call(app.dir.path());
    let original = std::fs::read(&path).unwrap();
    let engine = app.engine(app.config(25 * 1024 * 1024));

    let transcript = engine
        .transcribe_file(&path, &CancellationToken::new())
        .await
        .unwrap();

    let blobs = app.storage.blobs.lock().unwrap();
    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs.values().next().unwrap(), &original);

    assert_eq!(transcript.render(), "Speaker 1: Hello.\nSpeaker 2: Hi there.");
    let prompts = app.model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Previous context:\n\n\nCurrent text:"));
}

#[tokio::test]
async fn failed_job_aborts_before_relabeling() {
    let app = TestApp::new(
        MemoryStorage::default(),
        ScriptedSpeech::failing("Audio is corrupt"),
        EchoModel::default(),
    );
    let path = short_call(app.dir.path());

    let err = app
        .engine(app.config(25 * 1024 * 1024))
        .transcribe_file(&path, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(&err, TranscriptionError::JobFailed(reason) if reason == "Audio is corrupt"));
    assert_eq!(err.kind(), "TranscriptionJobFailed");
    assert!(app.model.prompts().is_empty());
    assert!(!app.dir.path().join("transcripts").exists());
    assert_eq!(app.storage.deleted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn upload_failure_never_submits() {
    let app = TestApp::new(
        MemoryStorage {
            fail_uploads: true,
            ..Default::default()
        },
        ScriptedSpeech::default(),
        EchoModel::default(),
    );
    let path = short_call(app.dir.path());

    let err = app
        .engine(app.config(25 * 1024 * 1024))
        .transcribe_file(&path, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "UploadFailure");
    assert!(err.to_string().contains("storage quota exceeded"));
    assert!(app.speech.submitted.lock().unwrap().is_empty());
    assert_eq!(app.storage.deleted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_run_stops_early() {
    let app = TestApp::new(
        MemoryStorage::default(),
        ScriptedSpeech::default(),
        EchoModel::default(),
    );
    let path = short_call(app.dir.path());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = app
        .engine(app.config(25 * 1024 * 1024))
        .transcribe_file(&path, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, TranscriptionError::Cancelled));
    assert!(app.speech.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"not audio at all").unwrap();

    let err = AudioAsset::load(&path).await.unwrap_err();
    assert_eq!(err.kind(), "UnsupportedFormat");
}
