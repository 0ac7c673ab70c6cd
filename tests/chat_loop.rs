//! Conversation loop tests with scripted input and stubbed services

use voice_companion::avatar::{AvatarPresenter, AvatarState};
use voice_companion::chat_loop::{ConversationLoop, FAREWELL, InputMode, QuitChoice};
use voice_companion::config::AvatarConfig;
use voice_companion::conversation::{ConversationStore, Message};

mod common;
use common::{
    Answer, FakeSink, FakeSynth, RecordingSurface, SYSTEM_PROMPT, ScriptedPrompter, StaticChat,
    files_in, generator, persisted, speaker, store_in,
};

fn avatar(surface: &RecordingSurface) -> AvatarPresenter {
    let config = AvatarConfig {
        enabled: true,
        title: "Riko".to_string(),
        preview_chars: 50,
    };
    let surface = surface.clone();
    AvatarPresenter::spawn(&config, move || Ok(surface)).unwrap()
}

fn states(surface: &RecordingSurface) -> Vec<AvatarState> {
    surface.frames().into_iter().map(|view| view.state).collect()
}

#[tokio::test]
async fn text_turn_speaks_reply_and_saves_history() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let store = store_in(&dir);
    let sink = FakeSink::ok();
    let surface = RecordingSurface::default();
    let prompter = ScriptedPrompter::new([
        Answer::Mode(InputMode::Text),
        Answer::Line("hi"),
        Answer::Mode(InputMode::Quit),
        Answer::Quit(QuitChoice::Save),
    ]);

    let choice = ConversationLoop::new(
        generator(StaticChat::replying("hello!"), store.clone()),
        "Riko",
        &audio_dir,
        prompter.clone(),
    )
    .with_speaker(speaker(FakeSynth::ok(), sink.clone(), &audio_dir))
    .with_avatar(avatar(&surface))
    .auto_play(Some(true))
    .run_until(std::future::pending())
    .await;

    assert_eq!(choice, QuitChoice::Save);
    assert!(prompter.said("Riko: hello!"));
    assert!(prompter.said("[OK] Chat history saved!"));
    assert_eq!(
        persisted(store.path()),
        vec![
            Message::system(SYSTEM_PROMPT),
            Message::user("hi"),
            Message::assistant("hello!"),
        ]
    );

    // Reply and farewell were both spoken, leaving no artifacts
    assert_eq!(sink.played().len(), 2);
    assert!(files_in(&audio_dir).is_empty());

    assert_eq!(
        states(&surface),
        vec![
            AvatarState::Idle,
            AvatarState::speaking("hello!", 50),
            AvatarState::Idle,
            AvatarState::speaking(FAREWELL, 50),
            AvatarState::Idle,
        ]
    );
    assert!(surface.torn_down());
}

#[tokio::test]
async fn empty_input_asks_again_without_calling_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let chat = StaticChat::replying("unused");
    let prompter = ScriptedPrompter::new([
        Answer::Mode(InputMode::Text),
        Answer::Line("   "),
        Answer::Mode(InputMode::Quit),
        Answer::Quit(QuitChoice::Save),
    ]);

    ConversationLoop::new(
        generator(chat.clone(), store_in(&dir)),
        "Riko",
        dir.path().join("audio"),
        prompter.clone(),
    )
    .run_until(std::future::pending())
    .await;

    assert!(prompter.said("(No input detected, try again)"));
    assert!(chat.requests().is_empty());
}

#[tokio::test]
async fn generation_failure_is_reported_and_loop_continues() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let prompter = ScriptedPrompter::new([
        Answer::Mode(InputMode::Text),
        Answer::Line("hello?"),
        Answer::Mode(InputMode::Text),
        Answer::Line("still there?"),
        Answer::Mode(InputMode::Quit),
        Answer::Quit(QuitChoice::Save),
    ]);

    let choice = ConversationLoop::new(
        generator(StaticChat::failing(), store.clone()),
        "Riko",
        dir.path().join("audio"),
        prompter.clone(),
    )
    .run_until(std::future::pending())
    .await;

    assert_eq!(choice, QuitChoice::Save);
    let errors = prompter
        .output()
        .iter()
        .filter(|line| line.contains("[ERROR]"))
        .count();
    assert_eq!(errors, 2);
    assert_eq!(prompter.remaining(), 0);
    assert!(!store.path().exists());
}

#[tokio::test]
async fn voice_failure_returns_avatar_to_idle() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let surface = RecordingSurface::default();
    let prompter = ScriptedPrompter::new([
        Answer::Mode(InputMode::Text),
        Answer::Line("sing for me"),
        Answer::Mode(InputMode::Quit),
        Answer::Quit(QuitChoice::Save),
    ]);

    ConversationLoop::new(
        generator(StaticChat::replying("la la la"), store_in(&dir)),
        "Riko",
        &audio_dir,
        prompter.clone(),
    )
    .with_speaker(speaker(FakeSynth::failing(), FakeSink::ok(), &audio_dir))
    .with_avatar(avatar(&surface))
    .auto_play(Some(true))
    .run_until(std::future::pending())
    .await;

    // Text still delivered, failure surfaced as a notice
    assert!(prompter.said("Riko: la la la"));
    assert!(prompter.said("[!] TTS error"));

    let states = states(&surface);
    assert_eq!(states[1], AvatarState::speaking("la la la", 50));
    assert_eq!(states[2], AvatarState::Idle);
    assert_eq!(states.last(), Some(&AvatarState::Idle));
    assert!(files_in(&audio_dir).is_empty());
}

#[tokio::test]
async fn playback_is_offered_when_auto_play_is_declined() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let sink = FakeSink::ok();
    let prompter = ScriptedPrompter::new([
        Answer::Confirm(false), // auto-play?
        Answer::Mode(InputMode::Text),
        Answer::Line("first"),
        Answer::Confirm(true), // play voice?
        Answer::Mode(InputMode::Text),
        Answer::Line("second"),
        Answer::Confirm(false),
        Answer::Mode(InputMode::Quit),
        Answer::Quit(QuitChoice::Save),
    ]);

    ConversationLoop::new(
        generator(StaticChat::replying("ok"), store_in(&dir)),
        "Riko",
        &audio_dir,
        prompter.clone(),
    )
    .with_speaker(speaker(FakeSynth::ok(), sink.clone(), &audio_dir))
    .run_until(std::future::pending())
    .await;

    assert!(!prompter.said("auto-play enabled"));
    // One accepted reply plus the farewell
    assert_eq!(sink.played().len(), 2);
    assert_eq!(prompter.remaining(), 0);
}

#[tokio::test]
async fn clear_on_quit_removes_history_and_audio() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    std::fs::create_dir_all(&audio_dir).unwrap();
    std::fs::write(audio_dir.join("conversation.wav"), b"RIFF").unwrap();
    std::fs::write(audio_dir.join("tts_stale.mp3"), b"ID3").unwrap();

    let store = store_in(&dir);
    let prompter = ScriptedPrompter::new([
        Answer::Mode(InputMode::Text),
        Answer::Line("remember me"),
        Answer::Mode(InputMode::Quit),
        Answer::Quit(QuitChoice::Clear),
    ]);

    let choice = ConversationLoop::new(
        generator(StaticChat::replying("never"), store.clone()),
        "Riko",
        &audio_dir,
        prompter.clone(),
    )
    .run_until(std::future::pending())
    .await;

    assert_eq!(choice, QuitChoice::Clear);
    assert!(!store.path().exists());
    assert!(files_in(&audio_dir).is_empty());
    assert!(prompter.said("[OK] Cleared: 2 audio file(s)"));
    assert!(prompter.said("Fresh start"));
    assert_eq!(store.load().messages(), &[Message::system(SYSTEM_PROMPT)]);
}

#[tokio::test]
async fn interrupt_offers_quit_menu_and_says_goodbye() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let store = store_in(&dir);
    let sink = FakeSink::ok();
    let surface = RecordingSurface::default();
    let prompter = ScriptedPrompter::new([Answer::Quit(QuitChoice::Save)]);

    let choice = ConversationLoop::new(
        generator(StaticChat::replying("unused"), store.clone()),
        "Riko",
        &audio_dir,
        prompter.clone(),
    )
    .with_speaker(speaker(FakeSynth::ok(), sink.clone(), &audio_dir))
    .with_avatar(avatar(&surface))
    .auto_play(Some(true))
    .run_until(std::future::ready(()))
    .await;

    assert_eq!(choice, QuitChoice::Save);
    assert_eq!(prompter.remaining(), 0);
    assert!(prompter.said("[OK] Chat history saved!"));
    assert_eq!(sink.played().len(), 1);
    assert_eq!(states(&surface).last(), Some(&AvatarState::Idle));
    assert!(surface.torn_down());
}

#[tokio::test]
async fn interrupt_with_pending_input_keeps_history_without_asking() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    let sink = FakeSink::ok();
    let surface = RecordingSurface::default();
    let prompter = ScriptedPrompter::new([Answer::Quit(QuitChoice::Clear)]).busy();

    let choice = ConversationLoop::new(
        generator(StaticChat::replying("unused"), store_in(&dir)),
        "Riko",
        &audio_dir,
        prompter.clone(),
    )
    .with_speaker(speaker(FakeSynth::ok(), sink.clone(), &audio_dir))
    .with_avatar(avatar(&surface))
    .run_until(std::future::ready(()))
    .await;

    assert_eq!(choice, QuitChoice::Save);
    assert_eq!(prompter.remaining(), 1);
    assert!(prompter.said("[OK] Chat history saved!"));
    assert!(sink.played().is_empty());
    assert!(surface.torn_down());
}

#[tokio::test]
async fn unsaved_history_still_carries_context() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let store = ConversationStore::new(blocker.join("chat_history.json"), SYSTEM_PROMPT);
    let chat = StaticChat::replying("nice to meet you");
    let prompter = ScriptedPrompter::new([
        Answer::Mode(InputMode::Text),
        Answer::Line("my name is Ana"),
        Answer::Mode(InputMode::Text),
        Answer::Line("what is my name?"),
        Answer::Mode(InputMode::Quit),
        Answer::Quit(QuitChoice::Save),
    ]);

    ConversationLoop::new(
        generator(chat.clone(), store),
        "Riko",
        dir.path().join("audio"),
        prompter.clone(),
    )
    .run_until(std::future::pending())
    .await;

    let requests = chat.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1],
        vec![
            Message::system(SYSTEM_PROMPT),
            Message::user("my name is Ana"),
            Message::assistant("nice to meet you"),
            Message::user("what is my name?"),
        ]
    );

    // Reported once, and the quit message does not claim success
    let notices = prompter
        .output()
        .iter()
        .filter(|line| line.contains("could not be saved, keeping it"))
        .count();
    assert_eq!(notices, 1);
    assert!(!prompter.said("[OK] Chat history saved!"));
}

#[tokio::test]
async fn closed_input_ends_session_and_keeps_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let prompter = ScriptedPrompter::new([
        Answer::Mode(InputMode::Text),
        Answer::Line("hi"),
    ]);

    let choice = ConversationLoop::new(
        generator(StaticChat::replying("hey"), store.clone()),
        "Riko",
        dir.path().join("audio"),
        prompter.clone(),
    )
    .run_until(std::future::pending())
    .await;

    assert_eq!(choice, QuitChoice::Save);
    assert_eq!(persisted(store.path()).len(), 3);
}
