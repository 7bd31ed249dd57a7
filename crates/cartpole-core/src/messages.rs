// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Append-only message log shared between the simulator and its control plugin.
//!
//! Producers hold a cloneable [`MessageSender`]; the owner of the
//! [`MessageQueue`] drains pending messages once per tick and keeps the full
//! history so it can be displayed or saved.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// The producing end of a [`MessageQueue`].
#[derive(Debug, Clone)]
pub struct MessageSender {
    sender: flume::Sender<String>,
}

impl MessageSender {
    /// Posts a message. Messages are raw text; include the newline if one is wanted.
    pub fn post(&self, message: impl Into<String>) {
        if let Err(e) = self.sender.send(message.into()) {
            log::error!("Failed to post message: {e}. Message queue dropped.");
        }
    }
}

/// Owns the channel and the accumulated message history.
#[derive(Debug)]
pub struct MessageQueue {
    sender: flume::Sender<String>,
    receiver: flume::Receiver<String>,
    history: String,
}

impl MessageQueue {
    /// Creates an empty queue backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sender,
            receiver,
            history: String::new(),
        }
    }

    /// Returns a new producer handle.
    pub fn sender(&self) -> MessageSender {
        MessageSender {
            sender: self.sender.clone(),
        }
    }

    /// Moves every pending message into the history and returns them.
    pub fn drain(&mut self) -> Vec<String> {
        let drained: Vec<String> = self.receiver.try_iter().collect();
        for message in &drained {
            self.history.push_str(message);
        }
        drained
    }

    /// Everything drained so far.
    pub fn history(&self) -> &str {
        &self.history
    }

    /// Appends the history to `path`, creating the file if needed.
    pub fn save(&mut self, path: impl AsRef<Path>) -> std::io::Result<()> {
        self.drain();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        file.write_all(self.history.as_bytes())
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}
