// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::ACCEPT;
use serde::Serialize;
use std::io::{BufRead, BufReader, Lines};
use std::time::Duration;
use tracing::{debug, warn};

pub const CHAT_PATH: &str = "/api/v1/chat";

pub const WELCOME_MESSAGE: &str = "Hello! I'm your business assistant. I can help with inventory, \
orders, clients, suppliers and financial reports. What would you like to know?";

const ERROR_PREFIX: &str = "[Error]:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_owned(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_owned(),
        }
    }
}

/// Blocking client for the backend's streaming chat relay.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `prompt` with the prior turns and returns the streamed reply.
    pub fn chat_stream(&self, prompt: &str, history: &[Message]) -> Result<ChatStream> {
        let request = ChatRequest {
            prompt,
            chat_history: history
                .iter()
                .map(|message| HistoryEntry {
                    kind: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
        };

        debug!(turns = history.len(), "sending chat prompt");
        let response = self
            .http
            .post(format!("{}{CHAT_PATH}", self.base_url))
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        Ok(ChatStream {
            done: false,
            lines: BufReader::new(response).lines(),
        })
    }
}

/// Reply text as it arrives. Each `data:` line is one chunk; `[DONE]` ends
/// the stream and an `[Error]:` line becomes an error.
pub struct ChatStream {
    done: bool,
    lines: Lines<BufReader<Response>>,
}

impl Iterator for ChatStream {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let line = match self.lines.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Ok(line)) => line,
                Some(Err(error)) => {
                    self.done = true;
                    return Some(Err(error).context("read chat stream"));
                }
            };

            let Some(payload) = line.strip_prefix("data: ") else {
                continue;
            };
            if payload.trim() == "[DONE]" {
                self.done = true;
                return None;
            }
            if let Some(message) = payload.strip_prefix(ERROR_PREFIX) {
                self.done = true;
                return Some(Err(anyhow!("assistant failed: {}", message.trim())));
            }
            if payload.is_empty() {
                continue;
            }
            return Some(Ok(payload.to_owned()));
        }
    }
}

/// A chat session. The first message is always the local welcome, which is
/// never sent back to the server.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self {
            messages: vec![Message::assistant(WELCOME_MESSAGE)],
        }
    }
}

impl Conversation {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Everything after the welcome message.
    pub fn history(&self) -> &[Message] {
        &self.messages[1..]
    }

    /// Sends a prompt and appends the streamed reply, handing each chunk to
    /// `on_chunk` as it arrives. On failure the reply reads `Error: ...` and
    /// the error is returned.
    pub fn send<F>(&mut self, client: &Client, prompt: &str, mut on_chunk: F) -> Result<&Message>
    where
        F: FnMut(&str),
    {
        if prompt.trim().is_empty() {
            bail!("prompt must not be empty");
        }

        self.messages.push(Message::user(prompt));
        let outcome = client
            .chat_stream(prompt, self.history())
            .and_then(|stream| {
                let mut reply = String::new();
                for chunk in stream {
                    let chunk = chunk?;
                    on_chunk(&chunk);
                    reply.push_str(&chunk);
                }
                Ok(reply)
            });

        match outcome {
            Ok(reply) => {
                self.messages.push(Message::assistant(&reply));
                Ok(&self.messages[self.messages.len() - 1])
            }
            Err(error) => {
                warn!(error = %format!("{error:#}"), "chat request failed");
                self.messages
                    .push(Message::assistant(&format!("Error: {error:#}")));
                Err(error)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
    chat_history: Vec<HistoryEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    content: &'a str,
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!("cannot reach the assistant at {base_url} -- is the API server running? ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(message) = parsed
            .get("detail")
            .or_else(|| parsed.get("error"))
            .and_then(serde_json::Value::as_str)
        && !message.is_empty()
    {
        return anyhow!("assistant error ({}): {message}", status.as_u16());
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("assistant error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("assistant returned {}", status.as_u16())
}
