//! Speech synthesizer cleanup tests
//!
//! Whatever happens during synthesis or playback, no audio artifact created
//! by a call may remain in the audio directory afterwards.

use voice_companion::Error;

mod common;
use common::{FakeSink, FakeSynth, files_in, speaker};

#[tokio::test]
async fn artifact_is_played_then_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let sink = FakeSink::ok();
    let speaker = speaker(FakeSynth::ok(), sink.clone(), &audio_dir);

    speaker.speak("hello there").await.unwrap();

    let played = sink.played();
    assert_eq!(played.len(), 1);
    let (path, existed) = &played[0];
    assert!(existed, "artifact must exist while it plays");
    assert!(path.starts_with(&audio_dir));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp3"));

    assert!(files_in(&audio_dir).is_empty());
}

#[tokio::test]
async fn playback_failure_still_deletes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let sink = FakeSink::failing();
    let speaker = speaker(FakeSynth::ok(), sink.clone(), &audio_dir);

    let err = speaker.speak("hello").await.unwrap_err();

    assert!(matches!(err, Error::Playback(_)));
    assert_eq!(sink.played().len(), 1);
    assert!(files_in(&audio_dir).is_empty());
}

#[tokio::test]
async fn synthesis_failure_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let sink = FakeSink::ok();
    let speaker = speaker(FakeSynth::failing(), sink.clone(), &audio_dir);

    let err = speaker.speak("hello").await.unwrap_err();

    assert!(matches!(err, Error::Synthesis(_)));
    assert!(sink.played().is_empty());
    assert!(files_in(&audio_dir).is_empty());
}

#[tokio::test]
async fn unrelated_files_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    std::fs::create_dir_all(&audio_dir).unwrap();
    let recording = audio_dir.join("conversation.wav");
    std::fs::write(&recording, b"RIFF").unwrap();

    speaker(FakeSynth::ok(), FakeSink::ok(), &audio_dir)
        .speak("hi")
        .await
        .unwrap();
    let _ = speaker(FakeSynth::failing(), FakeSink::ok(), &audio_dir)
        .speak("hi")
        .await;

    assert_eq!(files_in(&audio_dir), vec![recording]);
}

#[tokio::test]
async fn dropped_call_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let speaker = speaker(FakeSynth::ok(), FakeSink::ok(), &audio_dir);

    let artifact = speaker.synthesize("kept for a moment", "en-US-AnaNeural").await.unwrap();
    assert!(artifact.path().exists());
    assert_eq!(
        std::fs::read(artifact.path()).unwrap(),
        b"ID3 kept for a moment"
    );

    drop(artifact);
    assert!(files_in(&audio_dir).is_empty());
}

#[tokio::test]
async fn each_call_uses_a_fresh_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let sink = FakeSink::ok();
    let speaker = speaker(FakeSynth::ok(), sink.clone(), &audio_dir);

    speaker.speak("one").await.unwrap();
    speaker.speak("two").await.unwrap();

    let played = sink.played();
    assert_eq!(played.len(), 2);
    assert_ne!(played[0].0, played[1].0);
}

#[tokio::test]
async fn blank_text_is_not_synthesized() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FakeSink::ok();
    let speaker = speaker(FakeSynth::failing(), sink.clone(), dir.path());

    speaker.speak("   ").await.unwrap();
    assert!(sink.played().is_empty());
}
