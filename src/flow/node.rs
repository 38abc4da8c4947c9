use serde::Deserialize;

use crate::flow::ContentError;
use crate::video::{EmbedParams, VideoRef};

/// A single entry in the conversation table, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConversationNode {
    /// Plain system message, optionally followed by another node.
    Message {
        text: String,
        #[serde(default)]
        next: Option<String>,
    },
    /// A prompt with the choices offered to the user.
    Options {
        text: String,
        options: Vec<ChatOption>,
    },
    /// Side effect only; never shown in the transcript.
    Command {
        command: CommandName,
        #[serde(default)]
        params: CommandParams,
        #[serde(default)]
        next: Option<String>,
    },
    /// Floor map shown next to the avatar video.
    MapWithVideo {
        #[serde(default)]
        text: Option<String>,
        image: String,
        floor: String,
        #[serde(default)]
        next: Option<String>,
    },
}

impl ConversationNode {
    pub fn kind(&self) -> &'static str {
        match self {
            ConversationNode::Message { .. } => "message",
            ConversationNode::Options { .. } => "options",
            ConversationNode::Command { .. } => "command",
            ConversationNode::MapWithVideo { .. } => "mapWithVideo",
        }
    }

    /// Every node id this node can lead to.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            ConversationNode::Options { options, .. } => {
                options.iter().map(|o| o.next.as_str()).collect()
            }
            ConversationNode::Message { next, .. }
            | ConversationNode::Command { next, .. }
            | ConversationNode::MapWithVideo { next, .. } => next.as_deref().into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatOption {
    pub label: String,
    pub next: String,
}

impl ChatOption {
    pub fn new(label: impl Into<String>, next: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            next: next.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Closed set of command names accepted in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandName {
    SetFloatingAvatarVideo,
}

impl CommandName {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::SetFloatingAvatarVideo => "setFloatingAvatarVideo",
        }
    }
}

/// Raw parameter bag of a command node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommandParams {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub mute: Option<bool>,
    #[serde(default)]
    pub controls: Option<bool>,
    // Layout hints for the widget; accepted but not acted upon.
    #[serde(default)]
    pub float: Option<bool>,
    #[serde(default)]
    pub resizable: Option<bool>,
}

impl CommandParams {
    pub fn video(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            mute: Some(true),
            controls: Some(false),
            float: Some(true),
            resizable: Some(true),
        }
    }
}

/// A command resolved against its parameters, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetFloatingAvatarVideo { video: VideoRef, embed: EmbedParams },
}

impl Command {
    pub fn resolve(
        node_id: &str,
        name: CommandName,
        params: &CommandParams,
    ) -> Result<Self, ContentError> {
        match name {
            CommandName::SetFloatingAvatarVideo => {
                let url = params
                    .url
                    .as_deref()
                    .ok_or_else(|| ContentError::MissingParameter {
                        node: node_id.to_string(),
                        command: name.as_str(),
                        parameter: "url",
                    })?;
                let defaults = EmbedParams::default();
                Ok(Command::SetFloatingAvatarVideo {
                    video: VideoRef::parse(url)?,
                    embed: EmbedParams {
                        muted: params.mute.unwrap_or(defaults.muted),
                        controls: params.controls.unwrap_or(defaults.controls),
                        ..defaults
                    },
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Floor map
// ---------------------------------------------------------------------------

/// The floor map currently displayed beside the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRef {
    pub image: String,
    pub floor: String,
    zoomed: bool,
}

impl MapRef {
    pub fn new(image: impl Into<String>, floor: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            floor: floor.into(),
            zoomed: false,
        }
    }

    pub fn caption(&self) -> String {
        format!("Toque para ampliar o mapa do {}", self.floor)
    }

    pub fn alt_text(&self) -> String {
        if self.zoomed {
            format!("Mapa ampliado do {}", self.floor)
        } else {
            format!("Mapa do {}", self.floor)
        }
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoomed
    }

    pub fn open_zoom(&mut self) {
        self.zoomed = true;
    }

    pub fn close_zoom(&mut self) {
        self.zoomed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_each_kind() {
        let json = r#"[
            {"kind": "message", "text": "hi", "next": "menu"},
            {"kind": "options", "text": "pick", "options": [{"label": "A", "next": "x"}]},
            {"kind": "command", "command": "setFloatingAvatarVideo",
             "params": {"url": "https://vimeo.com/1", "mute": true}, "next": "menu"},
            {"kind": "mapWithVideo", "image": "/térreo.png", "floor": "Térreo"}
        ]"#;

        let nodes: Vec<ConversationNode> = serde_json::from_str(json).unwrap();
        let kinds: Vec<_> = nodes.iter().map(ConversationNode::kind).collect();
        assert_eq!(kinds, ["message", "options", "command", "mapWithVideo"]);
        assert_eq!(nodes[1].targets(), ["x"]);
        assert!(nodes[3].targets().is_empty());
    }

    #[test]
    fn rejects_unknown_command_names() {
        let json = r#"{"kind": "command", "command": "setFloatingAvatarVidoe", "next": "menu"}"#;
        assert!(serde_json::from_str::<ConversationNode>(json).is_err());
    }

    #[test]
    fn resolve_requires_url() {
        let err = Command::resolve(
            "video",
            CommandName::SetFloatingAvatarVideo,
            &CommandParams::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ContentError::MissingParameter { parameter: "url", .. }
        ));
    }

    #[test]
    fn resolve_applies_player_overrides() {
        let params = CommandParams {
            mute: Some(false),
            ..CommandParams::video("https://vimeo.com/7")
        };
        let Command::SetFloatingAvatarVideo { video, embed } =
            Command::resolve("video", CommandName::SetFloatingAvatarVideo, &params).unwrap();
        assert_eq!(video.id(), "7");
        assert!(!embed.muted);
        assert!(!embed.controls);
        assert!(embed.autoplay);
    }

    #[test]
    fn map_zoom_toggles_alt_text() {
        let mut map = MapRef::new("/ifce.png", "Térreo");
        assert_eq!(map.caption(), "Toque para ampliar o mapa do Térreo");
        assert_eq!(map.alt_text(), "Mapa do Térreo");

        map.open_zoom();
        assert!(map.is_zoomed());
        assert_eq!(map.alt_text(), "Mapa ampliado do Térreo");

        map.close_zoom();
        assert!(!map.is_zoomed());
    }
}
