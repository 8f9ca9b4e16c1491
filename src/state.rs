use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::models::{AnalysisMode, ChannelBundle};

/// Default number of channels kept resident.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Identifies one channel selection. A fetch resolved under a stale token is
/// discarded rather than letting it overwrite the newer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionToken(u64);

/// Bounded per-channel bundle store. Eviction is oldest insertion first.
#[derive(Debug)]
pub struct ChannelCache {
    capacity: usize,
    entries: HashMap<String, ChannelBundle>,
    order: VecDeque<String>,
}

impl ChannelCache {
    pub fn new(capacity: usize) -> Self {
        ChannelCache {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, channel_id: &str) -> Option<&ChannelBundle> {
        self.entries.get(channel_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, bundle: ChannelBundle) {
        let channel_id = bundle.channel_id.clone();
        if self.entries.insert(channel_id.clone(), bundle).is_none() {
            self.order.push_back(channel_id);
        }
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                debug!(channel_id = %oldest, "evicting cached channel");
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }
}

/// The dashboard's mutable state, made explicit: current mode, current
/// channel selection, and the per-channel artifact cache.
#[derive(Debug)]
pub struct AppState {
    mode: AnalysisMode,
    current_channel: Option<String>,
    generation: u64,
    cache: ChannelCache,
}

impl AppState {
    pub fn new(mode: AnalysisMode) -> Self {
        AppState::with_capacity(mode, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(mode: AnalysisMode, capacity: usize) -> Self {
        AppState {
            mode,
            current_channel: None,
            generation: 0,
            cache: ChannelCache::new(capacity),
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    /// Switching modes re-renders from cached bundles; it never invalidates
    /// them.
    pub fn set_mode(&mut self, mode: AnalysisMode) {
        self.mode = mode;
    }

    pub fn current_channel(&self) -> Option<&str> {
        self.current_channel.as_deref()
    }

    /// Make `channel_id` the displayed channel and mint the token any
    /// in-flight fetch for it must present at resolution time.
    pub fn select_channel(&mut self, channel_id: &str) -> SelectionToken {
        self.current_channel = Some(channel_id.to_string());
        self.generation += 1;
        SelectionToken(self.generation)
    }

    pub fn is_current(&self, token: SelectionToken) -> bool {
        token.0 == self.generation
    }

    /// Store a resolved fetch. Returns false (and stores nothing) when a
    /// newer selection superseded the fetch while it was in flight.
    pub fn complete_fetch(&mut self, token: SelectionToken, bundle: ChannelBundle) -> bool {
        if !self.is_current(token) {
            debug!(channel_id = %bundle.channel_id, "discarding stale fetch");
            return false;
        }
        self.cache.insert(bundle);
        true
    }

    pub fn bundle(&self, channel_id: &str) -> Option<&ChannelBundle> {
        self.cache.get(channel_id)
    }

    /// The bundle for the currently selected channel, if resolved.
    pub fn current_bundle(&self) -> Option<&ChannelBundle> {
        self.cache.get(self.current_channel.as_deref()?)
    }
}
