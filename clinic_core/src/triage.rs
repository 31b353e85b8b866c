//! Guided intake conversations.
//!
//! Each conversation is an explicit [`TriageSession`] keyed by a UUID, so any
//! number of patients can be talking to the assistant at once. Questions are
//! asked in a fixed order; the language model only comments on each answer.
//! When the last answer arrives the collected data becomes a new patient.

use crate::error::StoreError;
use crate::scheduling::Patient;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use shared::gemini::{Content, ContentRole, GeminiClient};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI health assistant helping a clinic \
register new patients. The clinic asks the patient, one at a time, for their name, age, \
address, phone number and symptoms. Do not ask these questions yourself: briefly comment on \
each answer in a warm, reassuring tone to keep the conversation going. Once all five answers \
have been given, summarise the information collected and tell the person that a doctor will \
contact them.";

pub const GREETING: &str = "Sou seu assistente de saúde. Vou fazer algumas perguntas para entender melhor sua situação.";
pub const FAREWELL: &str = "Encerrando por aqui. Cuide-se!";
pub const FALLBACK_REPLY: &str = "Desculpe, não consegui gerar uma resposta.";
pub const COMPLETED_REPLY_SUFFIX: &str = "Coleta finalizada! Todos os dados foram salvos.";
const EXIT_WORDS: [&str; 3] = ["sair", "exit", "quit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IntakeField {
    Name,
    Age,
    Address,
    Phone,
    Symptoms,
}

impl IntakeField {
    pub const ORDER: [Self; 5] = [
        Self::Name,
        Self::Age,
        Self::Address,
        Self::Phone,
        Self::Symptoms,
    ];

    pub const fn question(self) -> &'static str {
        match self {
            Self::Name => "Qual é o seu nome?",
            Self::Age => "Qual é a sua idade?",
            Self::Address => "Qual é o seu endereço?",
            Self::Phone => "Qual é o seu telefone?",
            Self::Symptoms => "Quais são os seus sintomas?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
    System,
}

impl Author {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub conversation_id: Uuid,
    pub logged_at: DateTime<Utc>,
    pub author: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub conversation_id: Uuid,
    pub author: Author,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewPatient {
    pub name: String,
    pub age: String,
    pub address: String,
    pub phone: Option<String>,
    pub symptoms: Option<String>,
}

/// Append-only transcript of every conversation turn.
pub trait ConversationLog: Send + Sync {
    fn append(&self, entry: NewLogEntry)
    -> impl Future<Output = Result<LogEntry, StoreError>> + Send;

    /// Entries by id ascending, optionally limited to one conversation.
    fn history(
        &self,
        conversation_id: Option<Uuid>,
    ) -> impl Future<Output = Result<Vec<LogEntry>, StoreError>> + Send;
}

/// The only way the intake pathway touches the rest of the system.
pub trait PatientIntake: Send + Sync {
    fn create_patient(
        &self,
        patient: NewPatient,
    ) -> impl Future<Output = Result<Patient, StoreError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum LanguageModelError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("language model unavailable: {0}")]
    Unavailable(String),
}

/// Opaque text service: whole transcript in, next assistant message out.
pub trait LanguageModel: Send + Sync {
    fn reply(
        &self,
        system_prompt: &str,
        transcript: &[ChatTurn],
    ) -> impl Future<Output = Result<String, LanguageModelError>> + Send;
}

impl LanguageModel for GeminiClient {
    async fn reply(
        &self,
        system_prompt: &str,
        transcript: &[ChatTurn],
    ) -> Result<String, LanguageModelError> {
        let contents: Vec<Content> = transcript
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    TurnRole::User => ContentRole::User,
                    TurnRole::Model => ContentRole::Model,
                };
                Content::text(role, turn.text.clone())
            })
            .collect();

        Ok(self.generate(Some(system_prompt), &contents).await?)
    }
}

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("conversation {0} not found")]
    ConversationNotFound(Uuid),
    #[error(transparent)]
    LanguageModel(#[from] LanguageModelError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct TriageSession {
    answers: HashMap<IntakeField, String>,
    next_field: usize,
    transcript: Vec<ChatTurn>,
    last_activity: Instant,
    closed: bool,
}

impl TriageSession {
    fn new() -> Self {
        Self {
            answers: HashMap::new(),
            next_field: 0,
            transcript: Vec::new(),
            last_activity: Instant::now(),
            closed: false,
        }
    }

    pub fn current_field(&self) -> Option<IntakeField> {
        IntakeField::ORDER.get(self.next_field).copied()
    }

    fn record(&mut self, field: IntakeField, answer: &str) {
        self.answers.insert(field, answer.to_string());
        self.next_field += 1;
    }

    fn to_patient(&self) -> NewPatient {
        let answer = |field: IntakeField| self.answers.get(&field).cloned().unwrap_or_default();
        let optional = |field: IntakeField| Some(answer(field)).filter(|a| !a.is_empty());
        NewPatient {
            name: answer(IntakeField::Name),
            age: answer(IntakeField::Age),
            address: answer(IntakeField::Address),
            phone: optional(IntakeField::Phone),
            symptoms: optional(IntakeField::Symptoms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageStarted {
    pub conversation_id: Uuid,
    pub greeting: String,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageReply {
    pub conversation_id: Uuid,
    pub reply: String,
    pub next_question: Option<String>,
    pub completed: bool,
    pub patient_id: Option<i32>,
}

type SharedSession = Arc<Mutex<TriageSession>>;

pub struct TriageService<M, S> {
    model: M,
    store: S,
    system_prompt: String,
    max_idle: Duration,
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl<M, S> TriageService<M, S>
where
    M: LanguageModel,
    S: ConversationLog + PatientIntake,
{
    pub fn new(model: M, store: S, system_prompt: impl Into<String>, max_idle: Duration) -> Self {
        Self {
            model,
            store,
            system_prompt: system_prompt.into(),
            max_idle,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }

    fn evict_idle(&self) {
        let max_idle = self.max_idle;
        self.sessions.write().retain(|id, session| {
            // a session that is mid-turn is never idle
            let keep = session
                .try_lock()
                .map_or(true, |s| s.last_activity.elapsed() <= max_idle);
            if !keep {
                info!(name: "triage.session.evicted", conversation_id = %id, "evicted idle conversation");
            }
            keep
        });
    }

    fn session(&self, id: Uuid) -> Result<SharedSession, TriageError> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(TriageError::ConversationNotFound(id))
    }

    fn remove(&self, id: Uuid) {
        self.sessions.write().remove(&id);
    }

    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<TriageStarted, TriageError> {
        self.evict_idle();

        let id = Uuid::now_v7();
        self.store
            .append(NewLogEntry {
                conversation_id: id,
                author: Author::System,
                message: "conversation started".to_string(),
            })
            .await?;
        self.sessions
            .write()
            .insert(id, Arc::new(Mutex::new(TriageSession::new())));

        info!(name: "triage.session.started", conversation_id = %id, "triage conversation started");

        Ok(TriageStarted {
            conversation_id: id,
            greeting: GREETING.to_string(),
            question: IntakeField::ORDER[0].question().to_string(),
        })
    }

    #[instrument(skip(self, message))]
    pub async fn send(&self, conversation_id: Uuid, message: &str) -> Result<TriageReply, TriageError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(TriageError::EmptyMessage);
        }

        let shared = self.session(conversation_id)?;
        let mut session = shared.lock().await;
        if session.closed {
            return Err(TriageError::ConversationNotFound(conversation_id));
        }
        session.last_activity = Instant::now();

        if EXIT_WORDS.contains(&message.to_lowercase().as_str()) {
            self.store
                .append(NewLogEntry {
                    conversation_id,
                    author: Author::System,
                    message: "session closed by user".to_string(),
                })
                .await?;
            session.closed = true;
            self.remove(conversation_id);
            info!(name: "triage.session.closed", "conversation closed by user");
            return Ok(TriageReply {
                conversation_id,
                reply: FAREWELL.to_string(),
                next_question: None,
                completed: true,
                patient_id: None,
            });
        }

        let Some(field) = session.current_field() else {
            return Err(TriageError::ConversationNotFound(conversation_id));
        };

        self.store
            .append(NewLogEntry {
                conversation_id,
                author: Author::User,
                message: message.to_string(),
            })
            .await?;

        session.transcript.push(ChatTurn {
            role: TurnRole::User,
            text: message.to_string(),
        });
        let reply = match self.model.reply(&self.system_prompt, &session.transcript).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(name: "triage.model.failed", error = ?e, "language model call failed");
                session.transcript.pop();
                return Err(e.into());
            }
        };
        let reply = if reply.trim().is_empty() {
            FALLBACK_REPLY.to_string()
        } else {
            reply
        };

        self.store
            .append(NewLogEntry {
                conversation_id,
                author: Author::Assistant,
                message: reply.clone(),
            })
            .await?;
        session.transcript.push(ChatTurn {
            role: TurnRole::Model,
            text: reply.clone(),
        });
        session.record(field, message);

        if let Some(next) = session.current_field() {
            return Ok(TriageReply {
                conversation_id,
                reply,
                next_question: Some(next.question().to_string()),
                completed: false,
                patient_id: None,
            });
        }

        let patient = match self.store.create_patient(session.to_patient()).await {
            Ok(patient) => patient,
            Err(e) => {
                // the last answer can be sent again
                session.next_field -= 1;
                let turns = session.transcript.len();
                session.transcript.truncate(turns.saturating_sub(2));
                warn!(name: "triage.patient.failed", error = ?e, "could not store the collected patient");
                return Err(e.into());
            }
        };
        session.closed = true;
        drop(session);
        self.remove(conversation_id);
        info!(name: "triage.patient.created", patient_id = patient.id, "intake completed");

        Ok(TriageReply {
            conversation_id,
            reply: format!("{reply}\n\n{COMPLETED_REPLY_SUFFIX}"),
            next_question: None,
            completed: true,
            patient_id: Some(patient.id),
        })
    }

    pub async fn history(&self, conversation_id: Option<Uuid>) -> Result<Vec<LogEntry>, TriageError> {
        Ok(self.store.history(conversation_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_asked_in_intake_order() {
        let mut session = TriageSession::new();
        let mut asked = Vec::new();
        while let Some(field) = session.current_field() {
            asked.push(field);
            session.record(field, "x");
        }
        assert_eq!(asked, IntakeField::ORDER.to_vec());
    }

    #[test]
    fn blank_optional_answers_become_none() {
        let mut session = TriageSession::new();
        for (field, answer) in IntakeField::ORDER
            .into_iter()
            .zip(["Maria", "42", "Rua A, 1", "", "febre"])
        {
            session.record(field, answer);
        }
        let patient = session.to_patient();
        assert_eq!(patient.name, "Maria");
        assert_eq!(patient.phone, None);
        assert_eq!(patient.symptoms.as_deref(), Some("febre"));
    }

    #[test]
    fn author_labels() {
        assert_eq!(Author::User.as_str(), "user");
        assert_eq!(Author::Assistant.as_str(), "assistant");
        assert_eq!(Author::System.as_str(), "system");
    }
}
