// ABOUTME: Handle for one agent conversation session
// ABOUTME: Owns the session id, owning connection, closed flag, and message sequence counter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bridge_core::constants::agent_api::FIRST_SEQUENCE_ID;
use bridge_core::SessionState;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// An open (or closed) agent session
///
/// Sessions are created per prompt and owned by whoever drives that prompt; the
/// handle is closed exactly once through `AgentSessionClient::close_session`.
#[derive(Debug)]
pub struct AgentSession {
    id: String,
    owner: Uuid,
    created_at: DateTime<Utc>,
    closed: AtomicBool,
    next_sequence: AtomicU64,
}

impl AgentSession {
    /// Wrap a session id returned by the agent API
    #[must_use]
    pub fn new(id: String, owner: Uuid) -> Self {
        Self {
            id,
            owner,
            created_at: Utc::now(),
            closed: AtomicBool::new(false),
            next_sequence: AtomicU64::new(FIRST_SEQUENCE_ID),
        }
    }

    /// Agent-issued session id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Connection that triggered the session
    #[must_use]
    pub const fn owner(&self) -> Uuid {
        self.owner
    }

    /// Creation time
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.closed.load(Ordering::Acquire) {
            SessionState::Closed
        } else {
            SessionState::Open
        }
    }

    /// Take the next message sequence id: 1, 2, 3, ...
    pub fn next_sequence_id(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::AcqRel)
    }

    /// Mark closed; returns `true` only for the call that performed the transition
    pub(crate) fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }
}
