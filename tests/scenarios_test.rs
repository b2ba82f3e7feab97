//! End-to-end dialogs through the engine
//! Run with: cargo test --test scenarios_test

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use common::{engine_with, RecordingSpeaker};
use shellbot::{
    Bot, Command, CommandError, Config, Event, Request, StateMachine, Step, Transition, Visibility,
};

struct Hello;

#[async_trait]
impl Command for Hello {
    fn keyword(&self) -> &str {
        "hello"
    }

    fn information_message(&self) -> &str {
        "Say hello"
    }

    async fn execute(&self, bot: &Bot, _request: &Request) -> Result<(), CommandError> {
        bot.say("Hello, World");
        Ok(())
    }
}

/// Records the planets it explores and whether two explorations overlapped
#[derive(Clone, Default)]
struct Explore {
    visited: Arc<Mutex<Vec<String>>>,
    running: Arc<AtomicBool>,
    overlapped: Arc<AtomicBool>,
}

#[async_trait]
impl Command for Explore {
    fn keyword(&self) -> &str {
        "explore"
    }

    fn information_message(&self) -> &str {
        "Explore a planet"
    }

    fn is_interactive(&self) -> bool {
        false
    }

    async fn execute(&self, bot: &Bot, request: &Request) -> Result<(), CommandError> {
        if self.running.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        // the first planet takes longer, so a concurrent worker would finish Venus first
        let delay = if request.arguments == "Mercury" { 80 } else { 10 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.visited.lock().unwrap().push(request.arguments.clone());
        self.running.store(false, Ordering::SeqCst);

        bot.say(format!("Explored {}", request.arguments));
        Ok(())
    }
}

struct Suicide;

#[async_trait]
impl Command for Suicide {
    fn keyword(&self) -> &str {
        "suicide"
    }

    fn information_message(&self) -> &str {
        "Leave the group"
    }

    fn visibility(&self) -> Visibility {
        Visibility::Group
    }

    async fn execute(&self, bot: &Bot, _request: &Request) -> Result<(), CommandError> {
        bot.say("Bye bye");
        bot.dispose().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_hello_answers_once() {
    let speaker = RecordingSpeaker::new();
    let engine = engine_with(Config::default(), &speaker).command(Hello).build().unwrap();

    engine.route(Event::message("group", "hello")).await.unwrap();

    assert_eq!(speaker.said("group"), vec!["Hello, World"]);
}

#[tokio::test]
async fn test_keyword_is_case_insensitive() {
    let speaker = RecordingSpeaker::new();
    let engine = engine_with(Config::default(), &speaker).command(Hello).build().unwrap();

    engine.route(Event::message("group", "  HeLLo   there")).await.unwrap();

    assert_eq!(speaker.said("group"), vec!["Hello, World"]);
}

#[tokio::test]
async fn test_explore_runs_in_submission_order() {
    let speaker = RecordingSpeaker::new();
    let explore = Explore::default();
    let engine = engine_with(Config::default(), &speaker)
        .command(explore.clone())
        .build()
        .unwrap();

    engine.route(Event::message("space", "explore Mercury")).await.unwrap();
    engine.route(Event::message("space", "explore Venus")).await.unwrap();

    // dispatch of background commands returns before they run
    assert!(explore.visited.lock().unwrap().len() < 2);

    let said = speaker.wait_for("space", 2).await;
    assert_eq!(said, vec!["Explored Mercury", "Explored Venus"]);
    assert_eq!(*explore.visited.lock().unwrap(), vec!["Mercury", "Venus"]);
    assert!(!explore.overlapped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_group_only_command_is_unknown_in_direct_channel() {
    let speaker = RecordingSpeaker::new();
    let engine = engine_with(Config::default(), &speaker)
        .command(Suicide)
        .build()
        .unwrap();

    engine.route(Event::message("alice", "suicide").direct()).await.unwrap();

    let said = speaker.said("alice");
    assert_eq!(said.len(), 1);
    assert!(said[0].starts_with("Available commands:"));
    assert!(!said[0].contains("suicide"));
    assert!(engine.get("alice").await.is_some());

    engine.route(Event::message("room", "help")).await.unwrap();
    assert!(speaker.said("room")[0].contains("suicide - Leave the group"));

    engine.route(Event::message("room", "suicide")).await.unwrap();
    assert_eq!(speaker.said("room").last().map(String::as_str), Some("Bye bye"));
    assert!(engine.get("room").await.is_none());
}

#[tokio::test]
async fn test_dialog_machine_from_idle_to_done() {
    let speaker = RecordingSpeaker::new();
    let machine = StateMachine::builder()
        .prefix("dialog")
        .states(["idle", "collecting", "done"])
        .initial("idle")
        .transition(Transition::new("idle", "start", "collecting"))
        .transition(Transition::new("collecting", "finish", "done"))
        .build()
        .unwrap();
    let engine = engine_with(Config::default(), &speaker)
        .machine(machine)
        .build()
        .unwrap();
    let bot = engine.get_or_create("alice", true).await.unwrap();

    assert_eq!(bot.step("finish", Value::Null).await.unwrap(), Step::Ignored("idle".to_string()));

    let step = bot.step("start", Value::Null).await.unwrap();
    assert_eq!(step.state(), "collecting");
    let step = bot.step("finish", Value::Null).await.unwrap();
    assert_eq!(
        step,
        Step::Moved {
            from: "collecting".to_string(),
            to: "done".to_string()
        }
    );

    // terminal until reset
    assert!(bot.step("start", Value::Null).await.unwrap().is_ignored());
    engine.route(Event::message("alice", "start").direct()).await.unwrap();
    let machine = bot.machine().unwrap();
    assert_eq!(machine.current(&bot).await.unwrap(), "idle");
}

#[tokio::test]
async fn test_step_command_drives_the_machine() {
    let speaker = RecordingSpeaker::new();
    let machine = StateMachine::builder()
        .states(["one", "two"])
        .initial("one")
        .transition(Transition::new("one", "next", "two"))
        .on_enter("two", |bot| bot.say("Now in two"))
        .build()
        .unwrap();
    let engine = engine_with(Config::default(), &speaker)
        .machine(machine)
        .build()
        .unwrap();

    engine.route(Event::message("room", "step")).await.unwrap();
    engine.route(Event::message("room", "step")).await.unwrap();

    assert_eq!(
        speaker.said("room"),
        vec!["Now in two", "Nothing to do on 'next' while two"]
    );
}

#[tokio::test]
async fn test_upload_without_text_is_acknowledged() {
    let speaker = RecordingSpeaker::new();
    let engine = engine_with(Config::default(), &speaker).build().unwrap();

    engine
        .route(Event::upload("room", "picture024.png", "https://files/picture024.png"))
        .await
        .unwrap();
    engine.route(Event::message("room", "")).await.unwrap();

    let said = speaker.said("room");
    assert_eq!(said[0], "Thank you for the information shared!");
    assert!(said[1].starts_with("Available commands:"));
}

#[tokio::test]
async fn test_step_command_passes_only_the_text_after_the_trigger() {
    let speaker = RecordingSpeaker::new();
    let payloads = Arc::new(Mutex::new(Vec::new()));
    let seen = payloads.clone();
    let machine = StateMachine::builder()
        .prefix("basket")
        .states(["open", "closed"])
        .initial("open")
        .transition(Transition::new("open", "add", "open").with_action(move |_bot, payload| {
            seen.lock().unwrap().push(payload.clone());
            Ok(())
        }))
        .transition(Transition::new("open", "next", "closed"))
        .build()
        .unwrap();
    let engine = engine_with(Config::default(), &speaker)
        .machine(machine)
        .build()
        .unwrap();

    engine.route(Event::message("room", "step add apple pie")).await.unwrap();
    engine.route(Event::message("room", "step add")).await.unwrap();
    engine.route(Event::message("room", "step")).await.unwrap();

    assert_eq!(
        *payloads.lock().unwrap(),
        vec![Value::String("apple pie".to_string()), Value::Null]
    );
    let bot = engine.get("room").await.unwrap();
    assert_eq!(bot.machine().unwrap().current(&bot).await.unwrap(), "closed");
}

#[tokio::test]
async fn test_sleep_refuses_durations_it_cannot_represent() {
    let speaker = RecordingSpeaker::new();
    let engine = engine_with(Config::default(), &speaker).build().unwrap();

    engine.route(Event::message("room", "sleep 1e300")).await.unwrap();
    engine.route(Event::message("room", "sleep -1")).await.unwrap();
    engine.route(Event::message("room", "sleep 0")).await.unwrap();

    // sleep runs on the pipeline, one job after the other
    let said = speaker.wait_for("room", 3).await;
    assert_eq!(said.len(), 3);
    assert!(said[0].starts_with("Sorry, I failed to handle 'sleep': Invalid arguments"));
    assert!(said[1].starts_with("Sorry, I failed to handle 'sleep': Invalid arguments"));
    assert_eq!(said[2], "Slept for 0 seconds");
}
