pub mod node;
pub mod table;

use std::sync::Arc;
use std::time::Duration;

use log::{info, trace, warn};
use thiserror::Error;

use crate::flow::node::{ChatOption, Command, ConversationNode, MapRef};
use crate::flow::table::FlowTable;
use crate::timer::Scheduler;
use crate::video::{EmbedParams, VideoRef};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The conversation table itself is broken.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("start node '{0}' is not defined")]
    MissingStart(String),

    #[error("node '{from}' points to undefined node '{to}'")]
    DanglingReference { from: String, to: String },

    #[error("options node '{0}' has no options")]
    EmptyOptions(String),

    #[error("command '{command}' in node '{node}' is missing parameter '{parameter}'")]
    MissingParameter {
        node: String,
        command: &'static str,
        parameter: &'static str,
    },

    #[error("no video id can be extracted from '{0}'")]
    InvalidVideoUrl(String),

    #[error("failed to read flow file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed flow table: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("node '{0}' is not defined in the flow table")]
    UnknownNode(String),

    #[error("no options are being offered right now")]
    OptionsNotVisible,

    #[error("option {index} does not exist ({available} available)")]
    NoSuchOption { index: usize, available: usize },

    #[error(transparent)]
    Content(#[from] ContentError),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Auto-advance delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowConfig {
    /// Delay after the start node's message.
    pub first_message_delay: Duration,
    /// Delay after every other message.
    pub message_delay: Duration,
    /// Delay after a command, so the video swap lands before the next node.
    pub command_delay: Duration,
    pub map_delay: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            first_message_delay: Duration::from_millis(1500),
            message_delay: Duration::from_millis(2000),
            command_delay: Duration::from_millis(300),
            map_delay: Duration::from_millis(2000),
        }
    }
}

// ---------------------------------------------------------------------------
// Flow state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub id: String,
    pub text: String,
    pub from_system: bool,
}

/// Observable side effects, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Message(TranscriptEntry),
    OptionsShown(Vec<String>),
    OptionsHidden,
    VideoChanged(VideoRef),
    MapShown(MapRef),
    TranscriptCleared,
}

/// Per-session conversation state. Only the engine mutates it.
#[derive(Debug, Clone)]
pub struct FlowState {
    pub current_node_id: String,
    pub transcript: Vec<TranscriptEntry>,
    pub options_visible: bool,
    pub active_video: Option<VideoRef>,
    pub embed: EmbedParams,
    pub active_map: Option<MapRef>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct FlowEngine {
    table: Arc<FlowTable>,
    config: FlowConfig,
    state: FlowState,
    scheduler: Scheduler,
    effects: Vec<Effect>,
    entry_seq: u64,
}

impl FlowEngine {
    /// Start a session at the table's start node.
    pub fn new(table: Arc<FlowTable>, config: FlowConfig) -> Result<Self, FlowError> {
        let state = FlowState {
            current_node_id: table.start_node_id().to_string(),
            transcript: Vec::new(),
            options_visible: false,
            active_video: table.initial_video().cloned(),
            embed: EmbedParams::default(),
            active_map: None,
        };
        let mut engine = Self {
            table,
            config,
            state,
            scheduler: Scheduler::new(),
            effects: Vec::new(),
            entry_seq: 0,
        };

        info!("Session started. Initial node: {}", engine.state.current_node_id);
        engine.enter()?;
        Ok(engine)
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn current_node_id(&self) -> &str {
        &self.state.current_node_id
    }

    pub fn active_map_mut(&mut self) -> Option<&mut MapRef> {
        self.state.active_map.as_mut()
    }

    /// Options the user can pick from right now.
    pub fn visible_options(&self) -> &[ChatOption] {
        if !self.state.options_visible {
            return &[];
        }
        match self.table.get(&self.state.current_node_id) {
            Some(ConversationNode::Options { options, .. }) => options,
            _ => &[],
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// User picks the option at `index` of the current options node.
    ///
    /// Clears the transcript and map and cancels any pending auto-advance
    /// before entering the target.
    pub fn select_option(&mut self, index: usize) -> Result<(), FlowError> {
        if !self.state.options_visible {
            return Err(FlowError::OptionsNotVisible);
        }
        let options = self.visible_options();
        let option = options.get(index).ok_or(FlowError::NoSuchOption {
            index,
            available: options.len(),
        })?;
        let target = option.next.clone();

        info!(
            "Option selected: '{}' ({} -> {target})",
            option.label, self.state.current_node_id
        );

        self.scheduler.cancel_all();
        self.state.transcript.clear();
        self.emit(Effect::TranscriptCleared);
        self.state.active_map = None;
        self.hide_options();

        self.transition_to(target)
    }

    /// Let `elapsed` of virtual time pass, firing every auto-advance that
    /// comes due. Returns the number of transitions taken.
    pub fn advance(&mut self, elapsed: Duration) -> Result<usize, FlowError> {
        let until = self.scheduler.now() + elapsed;
        let mut taken = 0;

        while let Some(task) = self.scheduler.pop_due(until) {
            if task.origin != self.state.current_node_id {
                warn!(
                    "Discarding stale auto-advance {} -> {} (now at {})",
                    task.origin, task.target, self.state.current_node_id
                );
                continue;
            }
            info!("Auto-advance: {} -> {}", task.origin, task.target);
            self.transition_to(task.target)?;
            taken += 1;
        }

        Ok(taken)
    }

    fn transition_to(&mut self, target: String) -> Result<(), FlowError> {
        if self.table.get(&target).is_none() {
            return Err(FlowError::UnknownNode(target));
        }
        self.state.current_node_id = target;
        self.enter()
    }

    /// Apply the effects of the current node and schedule what follows it.
    fn enter(&mut self) -> Result<(), FlowError> {
        let table = Arc::clone(&self.table);
        let id = self.state.current_node_id.clone();
        let node = table
            .get(&id)
            .ok_or_else(|| FlowError::UnknownNode(id.clone()))?;

        info!("Entering node: {id} (kind={})", node.kind());

        match node {
            ConversationNode::MapWithVideo {
                text,
                image,
                floor,
                next,
            } => {
                if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                    self.push_system_message(&id, text);
                }
                let map = MapRef::new(image.as_str(), floor.as_str());
                self.state.active_map = Some(map.clone());
                self.emit(Effect::MapShown(map));
                self.hide_options();
                if let Some(next) = next {
                    self.scheduler.schedule(&id, next, self.config.map_delay);
                }
            }
            ConversationNode::Message { text, next } => {
                if !text.is_empty() {
                    self.push_system_message(&id, text);
                }
                if let Some(next) = next {
                    self.hide_options();
                    let delay = if id == table.start_node_id() {
                        self.config.first_message_delay
                    } else {
                        self.config.message_delay
                    };
                    self.scheduler.schedule(&id, next, delay);
                }
            }
            ConversationNode::Options { text, options } => {
                if !text.is_empty() {
                    self.push_system_message(&id, text);
                }
                self.state.options_visible = true;
                self.emit(Effect::OptionsShown(
                    options.iter().map(|o| o.label.clone()).collect(),
                ));
            }
            ConversationNode::Command {
                command,
                params,
                next,
            } => {
                let command = Command::resolve(&id, *command, params)?;
                self.execute(command);
                self.hide_options();
                if let Some(next) = next {
                    self.scheduler.schedule(&id, next, self.config.command_delay);
                }
            }
        }

        Ok(())
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::SetFloatingAvatarVideo { video, embed } => {
                info!("Floating avatar video set to {video}");
                self.state.active_video = Some(video.clone());
                self.state.embed = embed;
                self.emit(Effect::VideoChanged(video));
            }
        }
    }

    fn push_system_message(&mut self, node_id: &str, text: &str) {
        self.entry_seq += 1;
        let entry = TranscriptEntry {
            id: format!("{node_id}-{}", self.entry_seq),
            text: text.to_string(),
            from_system: true,
        };
        self.state.transcript.push(entry.clone());
        self.emit(Effect::Message(entry));
    }

    fn hide_options(&mut self) {
        if self.state.options_visible {
            self.state.options_visible = false;
            self.emit(Effect::OptionsHidden);
        }
    }

    fn emit(&mut self, effect: Effect) {
        trace!("Effect: {effect:?}");
        self.effects.push(effect);
    }
}
