use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tq_engine::player::{MessageRef, PlayerId};
use tq_engine::question::{Candidate, QuestionId};
use tq_web::{
    EventBus, MemoryQuestionBank, Messenger, MessengerError, QuestionMessage, SessionRegistry,
};

const DEMO_TOKEN: &str = "demo";
const DEMO_SCORE_LIMIT: i32 = 3;

/// Messenger for the local demo: prints traffic to stdout and remembers
/// the last question per player so the script can answer it.
#[derive(Default)]
struct DemoMessenger {
    next_msg: AtomicI64,
    last_question: Mutex<HashMap<PlayerId, (u64, QuestionId, Vec<QuestionId>)>>,
}

impl DemoMessenger {
    fn question_for(&self, player: PlayerId) -> Option<(u64, QuestionId, Vec<QuestionId>)> {
        self.last_question
            .lock()
            .ok()
            .and_then(|map| map.get(&player).cloned())
    }
}

impl Messenger for DemoMessenger {
    fn send_question(
        &self,
        player: PlayerId,
        message: &QuestionMessage<'_>,
    ) -> Result<MessageRef, MessengerError> {
        let labels: Vec<&str> = message
            .question
            .options
            .iter()
            .map(|o| o.label.as_str())
            .collect();
        println!(
            "[question #{} -> player {}] {} | options: {}",
            message.sequence,
            player,
            message.question.prompt,
            labels.join(", ")
        );
        if let Ok(mut map) = self.last_question.lock() {
            map.insert(
                player,
                (
                    message.sequence,
                    message.question.correct,
                    message.question.options.iter().map(|o| o.id).collect(),
                ),
            );
        }
        let id = self.next_msg.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageRef(id))
    }

    fn delete_message(&self, _player: PlayerId, _message: MessageRef) -> Result<(), MessengerError> {
        Ok(())
    }

    fn send_status(&self, player: PlayerId, text: &str) -> Result<(), MessengerError> {
        println!("[status -> player {}]\n{}", player, text);
        Ok(())
    }

    fn edit_shared_announcement(&self, token: &str, text: &str) -> Result<(), MessengerError> {
        println!("[announcement {}]\n{}", token, text);
        Ok(())
    }

    fn acknowledge(&self, _callback: &str, text: &str) -> Result<(), MessengerError> {
        println!("[ack] {}", text);
        Ok(())
    }
}

fn demo_candidates() -> Vec<Candidate> {
    let tracks = [
        (1, "Midnight Drive", "rock"),
        (2, "Paper Planes Home", "pop"),
        (3, "Rust Belt Blues", "rock"),
        (4, "Glass Harbor", "pop"),
        (5, "Northern Line", "rock"),
        (6, "Last Transmission", "rock"),
        (7, "Velvet Static", "pop"),
        (8, "Echo Garden", "pop"),
    ];
    tracks
        .iter()
        .map(|(id, title, category)| Candidate {
            id: QuestionId(*id),
            label: (*title).to_string(),
            prompt: format!("clip-{}", id),
            category: (*category).to_string(),
        })
        .collect()
}

/// Plays one scripted game through the full core: Bob fumbles the first
/// question, Alice then runs the table to the score limit.
pub fn run_demo(seed: u64, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
    let messenger = Arc::new(DemoMessenger::default());
    let source = Arc::new(MemoryQuestionBank::with_seed(demo_candidates(), seed));
    let registry = SessionRegistry::with_limits(
        messenger.clone(),
        source,
        Arc::new(EventBus::new()),
        DEMO_SCORE_LIMIT,
        Duration::from_secs(60),
    );

    if let Err(e) = registry.on_start(DEMO_TOKEN.to_string(), "any") {
        let _ = writeln!(err, "Error: could not start demo game: {}", e);
        return 1;
    }
    let alice = PlayerId(1);
    let bob = PlayerId(2);
    for (player, name) in [(alice, "Alice"), (bob, "Bob")] {
        if let Err(e) = registry.on_join(DEMO_TOKEN, player, name) {
            let _ = writeln!(err, "Error: {} could not join: {}", name, e);
            return 1;
        }
    }

    let Some((sequence, correct, options)) = messenger.question_for(bob) else {
        let _ = writeln!(err, "Error: no question was delivered to Bob");
        return 1;
    };
    let wrong = options
        .into_iter()
        .find(|id| *id != correct)
        .unwrap_or(correct);
    if let Err(e) = registry.on_answer(DEMO_TOKEN, "demo-cb", bob, sequence, wrong) {
        let _ = writeln!(err, "Error: {}", e);
        return 1;
    }

    let mut rounds = 0;
    loop {
        let ended = registry
            .get(DEMO_TOKEN)
            .map(|session| session.is_ended())
            .unwrap_or(true);
        if ended {
            break;
        }
        rounds += 1;
        if rounds > 10 {
            let _ = writeln!(err, "Error: demo game did not converge");
            return 1;
        }
        let Some((sequence, correct, _)) = messenger.question_for(alice) else {
            let _ = writeln!(err, "Error: no question was delivered to Alice");
            return 1;
        };
        if let Err(e) = registry.on_answer(DEMO_TOKEN, "demo-cb", alice, sequence, correct) {
            let _ = writeln!(err, "Error: {}", e);
            return 1;
        }
    }

    let Some(session) = registry.get(DEMO_TOKEN) else {
        let _ = writeln!(err, "Error: demo session disappeared");
        return 1;
    };
    let snapshot = session.snapshot();
    let _ = writeln!(out, "Demo game finished.");
    for (i, player) in snapshot.players.iter().enumerate() {
        let _ = writeln!(out, "{}. {}: {}", i + 1, player.display_name, player.score);
    }
    0
}
