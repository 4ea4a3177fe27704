use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ChannelConfig;

/// One of the two independently monitored lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::A, Channel::B];

    /// Signal byte written to the actuator for this lane.
    pub fn tag(self) -> u8 {
        match self {
            Channel::A => b'A',
            Channel::B => b'B',
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Channel::A => 0,
            Channel::B => 1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag() as char)
    }
}

/// Per-channel counters owned by the tracker.
#[derive(Debug, Clone)]
pub(crate) struct ChannelState {
    pub config: ChannelConfig,
    /// `None` once the number range is used up
    next_number: Option<u32>,
    exits: u64,
}

impl ChannelState {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            next_number: Some(config.starting_number),
            config,
            exits: 0,
        }
    }

    /// Hand out the next assigned number (post-increment), or `None` past `u32::MAX`.
    pub fn next_number(&mut self) -> Option<u32> {
        let number = self.next_number?;
        self.next_number = number.checked_add(1);
        Some(number)
    }

    pub fn record_exit(&mut self) {
        self.exits += 1;
    }

    pub fn exits(&self) -> u64 {
        self.exits
    }

    pub fn sorting_subsequence(&self) -> &BTreeSet<u32> {
        &self.config.sorting_subsequence
    }
}
