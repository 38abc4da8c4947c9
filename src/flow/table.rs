use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};
use serde::Deserialize;

use crate::flow::node::{ChatOption, Command, CommandName, CommandParams, ConversationNode};
use crate::flow::ContentError;
use crate::video::VideoRef;

/// The full conversation: a map of node-id -> ConversationNode.
///
/// Built once, validated, then shared read-only with every engine.
#[derive(Debug, Clone)]
pub struct FlowTable {
    nodes: HashMap<String, ConversationNode>,
    start_node_id: String,
    initial_video: Option<VideoRef>,
}

/// On-disk shape of a flow file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowFile {
    start: String,
    #[serde(default)]
    initial_video: Option<String>,
    nodes: HashMap<String, ConversationNode>,
}

impl FlowTable {
    pub fn new(
        start_node_id: impl Into<String>,
        nodes: impl IntoIterator<Item = (String, ConversationNode)>,
        initial_video: Option<&str>,
    ) -> Result<Self, ContentError> {
        let table = Self {
            nodes: nodes.into_iter().collect(),
            start_node_id: start_node_id.into(),
            initial_video: initial_video.map(VideoRef::parse).transpose()?,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let file: FlowFile = serde_json::from_str(json)?;
        Self::new(file.start, file.nodes, file.initial_video.as_deref())
    }

    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let json = std::fs::read_to_string(path).map_err(|source| ContentError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json(&json)?;
        info!(
            "Loaded flow table from {} ({} nodes, start={})",
            path.display(),
            table.node_count(),
            table.start_node_id
        );
        Ok(table)
    }

    pub fn get(&self, id: &str) -> Option<&ConversationNode> {
        self.nodes.get(id)
    }

    pub fn start_node_id(&self) -> &str {
        &self.start_node_id
    }

    pub fn initial_video(&self) -> Option<&VideoRef> {
        self.initial_video.as_ref()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check every reference and parameter in the table.
    ///
    /// Nodes are visited in id order so the reported error is stable.
    fn validate(&self) -> Result<(), ContentError> {
        if !self.nodes.contains_key(&self.start_node_id) {
            return Err(ContentError::MissingStart(self.start_node_id.clone()));
        }

        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort();

        for id in ids {
            let node = &self.nodes[id];

            if let ConversationNode::Options { options, .. } = node {
                if options.is_empty() {
                    return Err(ContentError::EmptyOptions(id.clone()));
                }
            }

            if let ConversationNode::Command {
                command, params, ..
            } = node
            {
                Command::resolve(id, *command, params)?;
            }

            for target in node.targets() {
                if !self.nodes.contains_key(target) {
                    return Err(ContentError::DanglingReference {
                        from: id.clone(),
                        to: target.to_string(),
                    });
                }
            }
        }

        debug!("Flow table validated: {} nodes", self.nodes.len());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Campus wayfinding scenario
// ---------------------------------------------------------------------------

const RECEPCAO_VIDEO: &str = "https://vimeo.com/1129591813";
const NAPNE_VIDEO: &str = "https://vimeo.com/1130092406";
const BIBLIOTECA_VIDEO: &str = "https://vimeo.com/1130092406";

pub fn campus_scenario() -> Result<FlowTable, ContentError> {
    let nodes = vec![
        (
            "start",
            ConversationNode::Message {
                text: "👋 Bem-vindo(a) ao Mapa Interativo Acessível do IFCE Fortaleza.\n\
                       O NeoTalk nasceu para tornar o campus mais acessível por meio da tecnologia.\n\
                       Aqui, qualquer pessoa pode se orientar com autonomia, inclusão e inovação, \
                       utilizando Libras, texto ou áudio.\n\n\
                       Mais que mapas, criamos conexões. 🌐"
                    .into(),
                next: Some("introduction".into()),
            },
        ),
        (
            "introduction",
            ConversationNode::Message {
                text: "Olá, eu sou a Lia.\n\
                       O NeoTalk é uma tecnologia assistiva criada para deixar o prédio Ernando \
                       Pinheiro 100% acessível em Libras.\n\
                       Aqui, o chat responde dúvidas sobre salas, banheiros, saídas de emergência \
                       e muito mais — tudo em Libras, texto ou áudio, como você preferir.\n\n\
                       Seu acesso, sua autonomia. Vamos começar?"
                    .into(),
                next: Some("menu_principal".into()),
            },
        ),
        (
            "menu_principal",
            ConversationNode::Options {
                text: "Escolha uma das opções abaixo para assistir ao vídeo correspondente:".into(),
                options: vec![
                    ChatOption::new("🎥 Recepção", "recepcao_video"),
                    ChatOption::new("🎥 NAPNE", "napne_video"),
                    ChatOption::new("🎥 Biblioteca", "biblioteca_video"),
                    ChatOption::new("🗺️ Mapa do térreo", "mapa_terreo"),
                ],
            },
        ),
        ("recepcao_video", video_command(RECEPCAO_VIDEO)),
        ("napne_video", video_command(NAPNE_VIDEO)),
        ("biblioteca_video", video_command(BIBLIOTECA_VIDEO)),
        (
            "mapa_terreo",
            ConversationNode::MapWithVideo {
                text: Some("Este é o mapa do térreo do prédio Ernando Pinheiro.".into()),
                image: "/lovable-uploads/IFCE.png".into(),
                floor: "Térreo".into(),
                next: Some("menu_principal".into()),
            },
        ),
    ];

    FlowTable::new(
        "start",
        nodes.into_iter().map(|(id, node)| (id.to_string(), node)),
        Some(RECEPCAO_VIDEO),
    )
}

fn video_command(url: &str) -> ConversationNode {
    ConversationNode::Command {
        command: CommandName::SetFloatingAvatarVideo,
        params: CommandParams::video(url),
        next: Some("menu_principal".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str, next: Option<&str>) -> ConversationNode {
        ConversationNode::Message {
            text: text.into(),
            next: next.map(Into::into),
        }
    }

    #[test]
    fn campus_scenario_is_valid() {
        let table = campus_scenario().unwrap();
        assert_eq!(table.start_node_id(), "start");
        assert_eq!(table.node_count(), 7);
        assert_eq!(table.initial_video().map(VideoRef::id), Some("1129591813"));
    }

    #[test]
    fn campus_scenario_always_returns_to_menu() {
        let table = campus_scenario().unwrap();
        let Some(ConversationNode::Options { options, .. }) = table.get("menu_principal") else {
            panic!("menu_principal must be an options node");
        };
        for option in options {
            let target = table.get(&option.next).unwrap();
            assert_eq!(target.targets(), ["menu_principal"], "{}", option.next);
        }
    }

    #[test]
    fn missing_start_is_rejected() {
        let err = FlowTable::new("start", [("other".to_string(), message("hi", None))], None)
            .unwrap_err();
        assert!(matches!(err, ContentError::MissingStart(id) if id == "start"));
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let err = FlowTable::new(
            "start",
            [("start".to_string(), message("hi", Some("nowhere")))],
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ContentError::DanglingReference { ref from, ref to } if from == "start" && to == "nowhere"
        ));
    }

    #[test]
    fn empty_options_are_rejected() {
        let err = FlowTable::new(
            "menu",
            [(
                "menu".to_string(),
                ConversationNode::Options {
                    text: "pick".into(),
                    options: vec![],
                },
            )],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::EmptyOptions(id) if id == "menu"));
    }

    #[test]
    fn command_without_url_is_rejected() {
        let json = r#"{
            "start": "video",
            "nodes": {
                "video": {"kind": "command", "command": "setFloatingAvatarVideo", "params": {"mute": true}}
            }
        }"#;
        let err = FlowTable::from_json(json).unwrap_err();
        assert!(matches!(err, ContentError::MissingParameter { .. }));
    }

    #[test]
    fn loads_from_json() {
        let json = r#"{
            "start": "start",
            "initialVideo": "https://vimeo.com/99",
            "nodes": {
                "start": {"kind": "message", "text": "hello", "next": "menu"},
                "menu": {"kind": "options", "text": "pick", "options": [
                    {"label": "A", "next": "start"}
                ]}
            }
        }"#;
        let table = FlowTable::from_json(json).unwrap();
        assert_eq!(table.node_count(), 2);
        assert_eq!(table.get("menu").map(ConversationNode::kind), Some("options"));
        assert_eq!(table.initial_video().map(VideoRef::id), Some("99"));
    }

    #[test]
    fn unusable_initial_video_is_rejected() {
        let err = FlowTable::new(
            "start",
            [("start".to_string(), message("hi", None))],
            Some("https://vimeo.com/"),
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::InvalidVideoUrl(url) if url == "https://vimeo.com/"));
    }

    #[test]
    fn unusable_command_url_is_rejected() {
        let json = r#"{
            "start": "video",
            "nodes": {
                "video": {"kind": "command", "command": "setFloatingAvatarVideo",
                          "params": {"url": "not a url"}}
            }
        }"#;
        let err = FlowTable::from_json(json).unwrap_err();
        assert!(matches!(err, ContentError::InvalidVideoUrl(url) if url == "not a url"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = FlowTable::from_json("{\"start\": 1}").unwrap_err();
        assert!(matches!(err, ContentError::Parse(_)));
    }
}
