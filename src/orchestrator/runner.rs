//! The request orchestrator: validates actions from the shell, dispatches
//! background work and applies the results.
//!
//! # Flow
//!
//! ```text
//! submit(question, role)
//!   └─▶ validate → state = Sending → spawn(complete → spawn_blocking(history.append))
//!                                           │
//!          RequestOutcome (unbounded mpsc) ◀┘
//!
//! poll()  (every frame, try_recv)
//!   ├─ Answered → show answer, reload history, Idle
//!   └─ Failed   → show "Error: …", Idle
//!
//! start_voice_input() → spawn_blocking(capture_and_transcribe) → TranscriptReady
//! speak(text)         → spawn_blocking(speak)                  → SpeechFinished
//! ```
//!
//! The orchestrator itself lives on the UI thread and is never shared; only
//! the collaborators behind `Arc`s cross into background units.

use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::config::RoleTable;
use crate::credential::Credential;
use crate::error::{AssistantError, ErrorKind};
use crate::history::{HistoryStore, InteractionRecord};
use crate::llm::{CompletionClient, UpstreamError};
use crate::speech::{SpeechError, SpeechInput, SpeechOutput};

use super::state::{Notice, OrchestratorEvent, RequestState, Status};

// ---------------------------------------------------------------------------
// SubmitError
// ---------------------------------------------------------------------------

/// Why an action was not dispatched. None of these change the request slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("please enter a question")]
    Empty,

    #[error("still working on the previous request")]
    Busy,

    #[error("no API key configured")]
    CredentialMissing,

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

// ---------------------------------------------------------------------------
// RequestOutcome
// ---------------------------------------------------------------------------

/// What a background request unit reports back.
#[derive(Debug)]
pub enum RequestOutcome {
    /// The API answered. `persisted` is the result of the history append.
    Answered {
        answer: String,
        persisted: Result<InteractionRecord, String>,
    },
    Failed(UpstreamError),
}

enum Completion {
    Request(RequestOutcome),
    Transcript(Result<String, SpeechError>),
    Spoken(Result<(), SpeechError>),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    runtime: Handle,
    client: Arc<dyn CompletionClient>,
    store: Arc<HistoryStore>,
    roles: RoleTable,
    credential: Option<Credential>,
    speech_in: Arc<dyn SpeechInput>,
    speech_out: Arc<dyn SpeechOutput>,

    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,

    state: RequestState,
    last_outcome: Option<RequestState>,
    listening: bool,
    speaking: bool,
    answer: String,
    status: Status,
    history: Vec<InteractionRecord>,
    notices: Vec<Notice>,
}

impl Orchestrator {
    /// Create an idle orchestrator and load the initial history snapshot.
    ///
    /// Background units are spawned on `runtime`. No credential is set;
    /// call [`set_credential`](Self::set_credential) once one is known.
    pub fn new(
        runtime: Handle,
        client: Arc<dyn CompletionClient>,
        store: HistoryStore,
        roles: RoleTable,
        speech_in: Arc<dyn SpeechInput>,
        speech_out: Arc<dyn SpeechOutput>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let history = store.load_all();
        log::info!(
            "orchestrator: {} history records from {}",
            history.len(),
            store.path().display()
        );
        Self {
            runtime,
            client,
            store: Arc::new(store),
            roles,
            credential: None,
            speech_in,
            speech_out,
            tx,
            rx,
            state: RequestState::Idle,
            last_outcome: None,
            listening: false,
            speaking: false,
            answer: String::new(),
            status: Status::Waiting,
            history,
            notices: Vec::new(),
        }
    }

    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Send `question` with the instruction of `role`.
    ///
    /// On `Ok` exactly one background unit is in flight and the state is
    /// `Sending`. Every `Err` leaves the request slot untouched.
    pub fn submit(&mut self, question: &str, role: &str) -> Result<(), SubmitError> {
        if self.state.is_busy() {
            log::debug!("orchestrator: submit rejected, request in flight");
            return Err(SubmitError::Busy);
        }

        let question = question.trim();
        if question.is_empty() {
            self.status = Status::NeedQuestion;
            return Err(SubmitError::Empty);
        }

        let credential = self
            .credential
            .clone()
            .ok_or(SubmitError::CredentialMissing)?;

        let instruction = match self.roles.instruction(role) {
            Some(instruction) => instruction.to_string(),
            None => {
                log::error!("orchestrator: role {role:?} is not in the role table");
                return Err(SubmitError::UnknownRole(role.to_string()));
            }
        };

        self.state = RequestState::Sending;
        self.status = Status::Sending;
        log::info!("orchestrator: sending question as {role:?}");

        let client = Arc::clone(&self.client);
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let question = question.to_string();

        self.runtime.spawn(async move {
            let outcome = match client
                .complete(&question, Some(&instruction), &credential)
                .await
            {
                Ok(answer) => {
                    let (q, a) = (question.clone(), answer.clone());
                    let persisted = match tokio::task::spawn_blocking(move || store.append(&q, &a))
                        .await
                    {
                        Ok(result) => result.map_err(|e| e.to_string()),
                        Err(e) => Err(format!("history write did not finish: {e}")),
                    };
                    RequestOutcome::Answered { answer, persisted }
                }
                Err(e) => RequestOutcome::Failed(e),
            };
            let _ = tx.send(Completion::Request(outcome));
        });

        Ok(())
    }

    /// Record a voice question in the background.
    pub fn start_voice_input(&mut self) -> Result<(), SubmitError> {
        if self.listening {
            return Err(SubmitError::Busy);
        }
        self.listening = true;
        self.status = Status::Listening;

        let input = Arc::clone(&self.speech_in);
        let tx = self.tx.clone();
        self.runtime.spawn_blocking(move || {
            let result = input.capture_and_transcribe();
            let _ = tx.send(Completion::Transcript(result));
        });
        Ok(())
    }

    /// Read `text` aloud in the background. Blank text is ignored.
    ///
    /// The status line shows "Speaking…" unless a request is in flight.
    pub fn speak(&mut self, text: &str) -> Result<(), SubmitError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        if self.speaking {
            return Err(SubmitError::Busy);
        }
        self.speaking = true;
        if !self.state.is_busy() {
            self.status = Status::Speaking;
        }

        let output = Arc::clone(&self.speech_out);
        let tx = self.tx.clone();
        let text = text.to_string();
        self.runtime.spawn_blocking(move || {
            let result = output.speak(&text);
            let _ = tx.send(Completion::Spoken(result));
        });
        Ok(())
    }

    /// Clear the answer display and reset the status line.
    pub fn clear(&mut self) {
        self.answer.clear();
        if !self.state.is_busy() {
            self.status = Status::Waiting;
        }
    }

    /// Show a past exchange. Returns the record so the shell can fill its
    /// input box with the question.
    pub fn select_history(&mut self, index: usize) -> Option<InteractionRecord> {
        let record = self.history.get(index)?.clone();
        self.answer = record.answer.clone();
        Some(record)
    }

    // -----------------------------------------------------------------------
    // Applying outcomes
    // -----------------------------------------------------------------------

    /// Apply every outcome that has arrived. Never blocks.
    pub fn poll(&mut self) -> Vec<OrchestratorEvent> {
        let mut events = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(completion, &mut events);
        }
        events
    }

    /// Wait for the next outcome, then apply it and anything else queued.
    ///
    /// Returns immediately when nothing is in flight.
    pub async fn settle(&mut self) -> Vec<OrchestratorEvent> {
        let mut events = Vec::new();
        if !self.has_pending() {
            return events;
        }
        if let Some(completion) = self.rx.recv().await {
            self.apply(completion, &mut events);
        }
        events.extend(self.poll());
        events
    }

    fn has_pending(&self) -> bool {
        self.state.is_busy() || self.listening || self.speaking
    }

    fn apply(&mut self, completion: Completion, events: &mut Vec<OrchestratorEvent>) {
        match completion {
            Completion::Request(RequestOutcome::Answered { answer, persisted }) => {
                if let Err(message) = persisted {
                    log::warn!("orchestrator: answer not saved: {message}");
                    self.notice(ErrorKind::Persistence, message, events);
                }
                self.answer = answer.clone();
                self.status = Status::Done;
                self.finish(RequestState::Succeeded);
                self.history = self.store.load_all();
                events.push(OrchestratorEvent::AnswerReady(answer));
                events.push(OrchestratorEvent::HistoryChanged);
            }
            Completion::Request(RequestOutcome::Failed(e)) => {
                let error = AssistantError::from(e);
                log::error!("orchestrator: request failed ({}): {error}", error.kind());
                self.answer = format!("Error: {error}");
                self.status = Status::Error;
                self.finish(RequestState::Failed);
                events.push(OrchestratorEvent::RequestFailed(self.answer.clone()));
            }
            Completion::Transcript(Ok(text)) => {
                self.listening = false;
                self.status = Status::Transcribed;
                log::debug!("orchestrator: transcript = {text:?}");
                events.push(OrchestratorEvent::TranscriptReady(text));
            }
            Completion::Transcript(Err(e)) => {
                self.listening = false;
                self.status = Status::SpeechFailed;
                self.notice(ErrorKind::Speech, e.to_string(), events);
            }
            Completion::Spoken(result) => {
                self.speaking = false;
                match result {
                    Ok(()) => {
                        if self.status == Status::Speaking {
                            self.status = Status::Done;
                        }
                        events.push(OrchestratorEvent::SpeechFinished);
                    }
                    Err(e) => {
                        self.status = Status::SpeechFailed;
                        self.notice(ErrorKind::Speech, e.to_string(), events);
                    }
                }
            }
        }
    }

    /// Record the terminal state and fold back to `Idle`.
    fn finish(&mut self, terminal: RequestState) {
        log::debug!("orchestrator: Sending → {} → Idle", terminal.label());
        self.last_outcome = Some(terminal);
        self.state = RequestState::Idle;
    }

    fn notice(&mut self, kind: ErrorKind, message: String, events: &mut Vec<OrchestratorEvent>) {
        let notice = Notice::new(kind, message);
        self.notices.push(notice.clone());
        events.push(OrchestratorEvent::Notice(notice));
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<RequestState> {
        self.last_outcome
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn history(&self) -> &[InteractionRecord] {
        &self.history
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Hand the accumulated notices to the caller.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::{tempdir, TempDir};
    use tokio::sync::Notify;

    use crate::speech::Unavailable;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Answers every prompt with a fixed string, optionally waiting for a
    /// go-ahead first. Records every call.
    struct ScriptedClient {
        answer: Result<String, u16>,
        gate: Option<Arc<Notify>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedClient {
        fn ok(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.into()),
                gate: None,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(status),
                gate: None,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn gated(answer: &str, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.into()),
                gate: Some(gate),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(
            &self,
            prompt: &str,
            system_instruction: Option<&str>,
            _credential: &Credential,
        ) -> Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), system_instruction.map(str::to_string)));
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(401) => Err(UpstreamError::Unauthorized(401)),
                Err(status) => Err(UpstreamError::Status {
                    status: *status,
                    body: "upstream broke".into(),
                }),
            }
        }
    }

    struct FixedTranscript(&'static str);

    impl SpeechInput for FixedTranscript {
        fn capture_and_transcribe(&self) -> Result<String, SpeechError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    struct CountingVoice {
        spoken: Mutex<Vec<String>>,
    }

    impl SpeechOutput for CountingVoice {
        fn speak(&self, text: &str) -> Result<(), SpeechError> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn roles() -> RoleTable {
        RoleTable::from_pairs([
            ("assistant", "You are a helpful assistant."),
            ("plain", ""),
        ])
    }

    fn make(client: Arc<ScriptedClient>) -> (Orchestrator, TempDir) {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path().join("history.json"));
        let mut orc = Orchestrator::new(
            Handle::current(),
            client,
            store,
            roles(),
            Arc::new(FixedTranscript("你好")),
            Arc::new(CountingVoice::default()),
        );
        orc.set_credential(Credential::new_unchecked("sk-test"));
        (orc, dir)
    }

    fn records_on_disk(dir: &TempDir) -> Vec<InteractionRecord> {
        HistoryStore::new(dir.path().join("history.json")).load_all()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn successful_request_shows_answer_and_records_it() {
        let client = ScriptedClient::ok("hi there");
        let (mut orc, dir) = make(Arc::clone(&client));

        orc.submit("hello", "assistant").unwrap();
        assert_eq!(orc.state(), RequestState::Sending);
        assert_eq!(orc.status(), Status::Sending);
        assert!(orc.is_busy());

        let events = orc.settle().await;
        assert!(events.contains(&OrchestratorEvent::AnswerReady("hi there".into())));
        assert!(events.contains(&OrchestratorEvent::HistoryChanged));

        assert_eq!(orc.state(), RequestState::Idle);
        assert_eq!(orc.last_outcome(), Some(RequestState::Succeeded));
        assert_eq!(orc.answer(), "hi there");
        assert_eq!(orc.status(), Status::Done);
        assert_eq!(client.calls(), 1);

        let records = records_on_disk(&dir);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].question, "hello");
        assert_eq!(records[0].answer, "hi there");
        assert_eq!(orc.history(), records.as_slice());
    }

    #[tokio::test]
    async fn role_instruction_is_sent_with_trimmed_question() {
        let client = ScriptedClient::ok("ok");
        let (mut orc, _dir) = make(Arc::clone(&client));

        orc.submit("  what time is it?\n", "assistant").unwrap();
        orc.settle().await;

        let seen = client.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            (
                "what time is it?".to_string(),
                Some("You are a helpful assistant.".to_string())
            )
        );
    }

    #[tokio::test]
    async fn blank_question_is_rejected_without_dispatch() {
        let client = ScriptedClient::ok("unused");
        let (mut orc, dir) = make(Arc::clone(&client));

        assert_eq!(orc.submit("   \n\t", "assistant"), Err(SubmitError::Empty));
        assert_eq!(orc.state(), RequestState::Idle);
        assert_eq!(orc.status(), Status::NeedQuestion);
        assert!(orc.settle().await.is_empty());
        assert_eq!(client.calls(), 0);
        assert!(records_on_disk(&dir).is_empty());
    }

    #[tokio::test]
    async fn second_submit_while_sending_is_busy() {
        let gate = Arc::new(Notify::new());
        let client = ScriptedClient::gated("first", Arc::clone(&gate));
        let (mut orc, dir) = make(Arc::clone(&client));

        orc.submit("one", "assistant").unwrap();
        assert_eq!(orc.submit("two", "assistant"), Err(SubmitError::Busy));
        assert_eq!(orc.state(), RequestState::Sending);

        gate.notify_one();
        orc.settle().await;

        assert_eq!(client.calls(), 1);
        let records = records_on_disk(&dir);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].question, "one");
    }

    #[tokio::test]
    async fn failed_request_shows_error_and_writes_nothing() {
        let client = ScriptedClient::failing(500);
        let (mut orc, dir) = make(client);

        orc.submit("hello", "assistant").unwrap();
        let events = orc.settle().await;

        assert!(matches!(&events[..], [OrchestratorEvent::RequestFailed(msg)] if msg.starts_with("Error: ")));
        assert_eq!(orc.state(), RequestState::Idle);
        assert_eq!(orc.last_outcome(), Some(RequestState::Failed));
        assert!(orc.answer().contains("500"));
        assert_eq!(orc.status(), Status::Error);
        assert!(records_on_disk(&dir).is_empty());
        assert!(orc.history().is_empty());
    }

    #[tokio::test]
    async fn submit_is_accepted_again_after_failure() {
        let client = ScriptedClient::failing(401);
        let (mut orc, _dir) = make(Arc::clone(&client));

        orc.submit("a", "assistant").unwrap();
        orc.settle().await;
        assert!(orc.submit("b", "assistant").is_ok());
        orc.settle().await;
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn unwritable_history_keeps_answer_and_adds_notice() {
        let dir = tempdir().expect("temp dir");
        // The history path is a directory, so the write fails.
        let store = HistoryStore::new(dir.path());
        let mut orc = Orchestrator::new(
            Handle::current(),
            ScriptedClient::ok("hi there"),
            store,
            roles(),
            Arc::new(Unavailable::new("no mic")),
            Arc::new(Unavailable::new("no voice")),
        );
        orc.set_credential(Credential::new_unchecked("sk-test"));

        orc.submit("hello", "assistant").unwrap();
        orc.settle().await;

        assert_eq!(orc.answer(), "hi there");
        assert_eq!(orc.last_outcome(), Some(RequestState::Succeeded));
        assert_eq!(orc.notices().len(), 1);
        assert_eq!(orc.notices()[0].kind, ErrorKind::Persistence);
        assert_eq!(orc.take_notices().len(), 1);
        assert!(orc.notices().is_empty());
    }

    #[tokio::test]
    async fn missing_credential_is_reported() {
        let dir = tempdir().expect("temp dir");
        let client = ScriptedClient::ok("unused");
        let mut orc = Orchestrator::new(
            Handle::current(),
            client.clone(),
            HistoryStore::new(dir.path().join("history.json")),
            roles(),
            Arc::new(Unavailable::new("no mic")),
            Arc::new(Unavailable::new("no voice")),
        );

        assert_eq!(orc.submit("hello", "assistant"), Err(SubmitError::CredentialMissing));
        assert_eq!(orc.state(), RequestState::Idle);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let client = ScriptedClient::ok("unused");
        let (mut orc, _dir) = make(Arc::clone(&client));

        assert_eq!(
            orc.submit("hello", "pirate"),
            Err(SubmitError::UnknownRole("pirate".into()))
        );
        assert_eq!(orc.state(), RequestState::Idle);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn voice_input_delivers_transcript() {
        let (mut orc, _dir) = make(ScriptedClient::ok("unused"));

        orc.start_voice_input().unwrap();
        assert!(orc.is_listening());
        assert_eq!(orc.status(), Status::Listening);
        assert_eq!(orc.start_voice_input(), Err(SubmitError::Busy));

        let events = orc.settle().await;
        assert_eq!(events, vec![OrchestratorEvent::TranscriptReady("你好".into())]);
        assert!(!orc.is_listening());
        assert_eq!(orc.status(), Status::Transcribed);
    }

    #[tokio::test]
    async fn voice_failure_becomes_speech_notice() {
        let dir = tempdir().expect("temp dir");
        let mut orc = Orchestrator::new(
            Handle::current(),
            ScriptedClient::ok("unused"),
            HistoryStore::new(dir.path().join("history.json")),
            roles(),
            Arc::new(Unavailable::new("no Whisper model")),
            Arc::new(Unavailable::new("no voice")),
        );

        orc.start_voice_input().unwrap();
        orc.settle().await;

        assert_eq!(orc.status(), Status::SpeechFailed);
        assert_eq!(orc.notices()[0].kind, ErrorKind::Speech);
        assert_eq!(orc.notices()[0].message, "no Whisper model");
        assert_eq!(orc.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn speak_ignores_blank_text() {
        let (mut orc, _dir) = make(ScriptedClient::ok("unused"));

        assert!(orc.speak("  ").is_ok());
        assert!(!orc.is_speaking());

        assert_eq!(orc.status(), Status::Waiting);

        orc.speak("hi there").unwrap();
        assert!(orc.is_speaking());
        assert_eq!(orc.status(), Status::Speaking);
        assert_eq!(orc.speak("again"), Err(SubmitError::Busy));
        assert_eq!(orc.settle().await, vec![OrchestratorEvent::SpeechFinished]);
        assert!(!orc.is_speaking());
        assert_eq!(orc.status(), Status::Done);
    }

    #[tokio::test]
    async fn speaking_does_not_hide_a_request_in_flight() {
        let gate = Arc::new(Notify::new());
        let (mut orc, _dir) = make(ScriptedClient::gated("later", Arc::clone(&gate)));

        orc.submit("hello", "assistant").unwrap();
        orc.speak("something").unwrap();
        assert_eq!(orc.status(), Status::Sending);

        gate.notify_one();
        while orc.has_pending() {
            orc.settle().await;
        }
        assert_eq!(orc.status(), Status::Done);
        assert_eq!(orc.answer(), "later");
    }

    #[tokio::test]
    async fn poll_applies_outcome_once_it_arrives() {
        let gate = Arc::new(Notify::new());
        let (mut orc, dir) = make(ScriptedClient::gated("hi there", Arc::clone(&gate)));

        orc.submit("hello", "assistant").unwrap();
        tokio::task::yield_now().await;
        assert!(orc.poll().is_empty());
        assert_eq!(orc.state(), RequestState::Sending);
        assert_eq!(orc.answer(), "");

        gate.notify_one();
        let mut events = Vec::new();
        for _ in 0..500 {
            events = orc.poll();
            if !events.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        assert_eq!(
            events,
            vec![
                OrchestratorEvent::AnswerReady("hi there".into()),
                OrchestratorEvent::HistoryChanged,
            ]
        );
        assert_eq!(orc.state(), RequestState::Idle);
        assert_eq!(orc.last_outcome(), Some(RequestState::Succeeded));
        assert_eq!(orc.answer(), "hi there");
        assert_eq!(records_on_disk(&dir).len(), 1);
        assert!(orc.poll().is_empty());
    }

    #[tokio::test]
    async fn answer_waits_for_history_write() {
        let (mut orc, dir) = make(ScriptedClient::ok("saved"));

        orc.submit("hello", "assistant").unwrap();
        orc.settle().await;

        // The outcome is only sent after the blocking append has finished.
        let records = records_on_disk(&dir);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].answer, "saved");
        assert_eq!(orc.history(), records.as_slice());
    }

    #[tokio::test]
    async fn clear_and_select_history() {
        let (mut orc, _dir) = make(ScriptedClient::ok("hi there"));
        orc.submit("hello", "plain").unwrap();
        orc.settle().await;

        orc.clear();
        assert_eq!(orc.answer(), "");
        assert_eq!(orc.status(), Status::Waiting);

        let record = orc.select_history(0).expect("record");
        assert_eq!(record.question, "hello");
        assert_eq!(orc.answer(), "hi there");
        assert!(orc.select_history(5).is_none());
    }

    #[tokio::test]
    async fn history_snapshot_is_loaded_on_start() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path().join("history.json"));
        store.append("earlier", "answer").unwrap();

        let orc = Orchestrator::new(
            Handle::current(),
            ScriptedClient::ok("unused"),
            store,
            roles(),
            Arc::new(Unavailable::new("no mic")),
            Arc::new(Unavailable::new("no voice")),
        );
        assert_eq!(orc.history().len(), 1);
        assert_eq!(orc.roles().len(), 2);
    }
}
