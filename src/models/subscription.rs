// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Subscription edges between users.

use serde::{Deserialize, Serialize};

/// Directed edge: `subscriber` follows `channel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// User ID of the follower
    pub subscriber: String,
    /// User ID of the channel being followed
    pub channel: String,
    pub created_at: String,
}

impl Subscription {
    /// Document ID; one edge per (subscriber, channel) pair.
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.subscriber, self.channel)
    }
}
