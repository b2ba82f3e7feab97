//! Background execution of non-interactive commands
//! Run with: cargo test --test pipeline_test

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use common::{ensure_init, RecordingSpeaker};
use shellbot::domain::entities::CommandRegistry;
use shellbot::infrastructure::storage::MemoryStore;
use shellbot::{Bot, Command, CommandError, PipelineError, Request};

/// Slow background command recording when each job starts and ends
#[derive(Clone, Default)]
struct Slow {
    events: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Command for Slow {
    fn keyword(&self) -> &str {
        "slow"
    }

    fn information_message(&self) -> &str {
        "Take some time"
    }

    fn is_interactive(&self) -> bool {
        false
    }

    async fn execute(&self, bot: &Bot, request: &Request) -> Result<(), CommandError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("start {}", request.arguments));

        tokio::time::sleep(Duration::from_millis(40)).await;

        self.events.lock().unwrap().push(format!("end {}", request.arguments));
        self.active.fetch_sub(1, Ordering::SeqCst);
        bot.say(format!("done {}", request.arguments));
        Ok(())
    }
}

/// Fails on `boom`, panics on `panic`
struct Flaky;

#[async_trait]
impl Command for Flaky {
    fn keyword(&self) -> &str {
        "flaky"
    }

    fn information_message(&self) -> &str {
        "Sometimes fails"
    }

    fn is_interactive(&self) -> bool {
        false
    }

    async fn execute(&self, bot: &Bot, request: &Request) -> Result<(), CommandError> {
        match request.arguments.as_str() {
            "boom" => Err(CommandError::ExecutionFailed("boom".to_string())),
            "panic" => panic!("kaboom"),
            other => {
                bot.say(format!("fine {}", other));
                Ok(())
            }
        }
    }
}

fn launch(commands: Vec<Arc<dyn Command>>, speaker: &Arc<RecordingSpeaker>) -> Arc<Bot> {
    ensure_init();
    let mut registry = CommandRegistry::new();
    for command in commands {
        registry.register_arc(command).unwrap();
    }
    Bot::new(
        "lab",
        false,
        Arc::new(registry),
        Arc::new(MemoryStore::new()),
        speaker.clone(),
    )
    .launch()
    .unwrap()
}

async fn wait_until_busy(bot: &Bot) {
    for _ in 0..200 {
        if bot.pipeline().is_busy() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("worker never picked up a job");
}

#[tokio::test]
async fn test_jobs_run_one_at_a_time_in_order() {
    let speaker = RecordingSpeaker::new();
    let slow = Slow::default();
    let bot = launch(vec![Arc::new(slow.clone())], &speaker);

    for name in ["a", "b", "c"] {
        bot.dispatch(&format!("slow {}", name)).await;
    }

    let said = speaker.wait_for("lab", 3).await;
    assert_eq!(said, vec!["done a", "done b", "done c"]);
    assert_eq!(
        *slow.events.lock().unwrap(),
        vec!["start a", "end a", "start b", "end b", "start c", "end c"]
    );
    assert_eq!(slow.peak.load(Ordering::SeqCst), 1);
    assert_eq!(bot.pipeline().processed(), 3);
}

#[tokio::test]
async fn test_submit_returns_increasing_sequence_numbers() {
    let speaker = RecordingSpeaker::new();
    let slow: Arc<dyn Command> = Arc::new(Slow::default());
    let bot = launch(vec![slow.clone()], &speaker);

    let first = bot.pipeline().submit(slow.clone(), Request::new("x")).unwrap();
    let second = bot.pipeline().submit(slow.clone(), Request::new("y")).unwrap();
    assert_eq!((first, second), (1, 2));
}

#[tokio::test]
async fn test_failures_do_not_stop_the_worker() {
    let speaker = RecordingSpeaker::new();
    let bot = launch(vec![Arc::new(Flaky)], &speaker);

    bot.dispatch("flaky boom").await;
    bot.dispatch("flaky panic").await;
    bot.dispatch("flaky ok").await;

    let said = speaker.wait_for("lab", 3).await;
    assert_eq!(
        said,
        vec![
            "Sorry, I failed to handle 'flaky': Execution failed: boom",
            "Sorry, I failed to handle 'flaky': Command panicked: kaboom",
            "fine ok",
        ]
    );
    assert_eq!(bot.pipeline().processed(), 3);
}

#[tokio::test]
async fn test_stop_finishes_current_job_and_discards_the_rest() {
    let speaker = RecordingSpeaker::new();
    let slow = Slow::default();
    let bot = launch(vec![Arc::new(slow.clone())], &speaker);

    for name in ["a", "b", "c"] {
        bot.dispatch(&format!("slow {}", name)).await;
    }
    wait_until_busy(&bot).await;

    bot.pipeline().stop();
    bot.pipeline().stop();
    bot.pipeline().join().await;

    assert_eq!(*slow.events.lock().unwrap(), vec!["start a", "end a"]);
    assert_eq!(speaker.said("lab"), vec!["done a"]);
    assert_eq!(bot.pipeline().processed(), 1);
    assert_eq!(bot.pipeline().pending(), 0);
}

#[tokio::test]
async fn test_submit_after_stop_is_refused() {
    let speaker = RecordingSpeaker::new();
    let slow: Arc<dyn Command> = Arc::new(Slow::default());
    let bot = launch(vec![slow.clone()], &speaker);

    bot.dispose().await;
    assert!(bot.is_disposed());
    assert_eq!(
        bot.pipeline().submit(slow, Request::new("late")).unwrap_err(),
        PipelineError::Stopped
    );

    bot.dispatch("slow late").await;
    assert_eq!(speaker.said("lab"), vec!["Sorry, I cannot handle 'slow' anymore"]);
}

#[tokio::test]
async fn test_pipeline_cannot_start_twice() {
    let speaker = RecordingSpeaker::new();
    let bot = launch(Vec::new(), &speaker);

    assert_eq!(
        bot.pipeline().start(Arc::downgrade(&bot)).unwrap_err(),
        PipelineError::AlreadyStarted
    );
}

#[tokio::test]
async fn test_channels_have_independent_workers() {
    let speaker = RecordingSpeaker::new();
    let slow = Slow::default();
    let mut registry = CommandRegistry::new();
    registry.register(slow.clone()).unwrap();
    let registry = Arc::new(registry);
    let store = Arc::new(MemoryStore::new());

    let left = Bot::new("left", false, registry.clone(), store.clone(), speaker.clone())
        .launch()
        .unwrap();
    let right = Bot::new("right", false, registry, store, speaker.clone())
        .launch()
        .unwrap();

    left.dispatch("slow l").await;
    right.dispatch("slow r").await;

    speaker.wait_for("left", 1).await;
    speaker.wait_for("right", 1).await;
    // both ran at the same time
    assert_eq!(slow.peak.load(Ordering::SeqCst), 2);
}
