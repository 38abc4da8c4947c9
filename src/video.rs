use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::flow::ContentError;

const PLAYER_BASE: &str = "https://player.vimeo.com/video";

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Last non-empty path segment, ignoring any query string or fragment.
    RE.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9+.-]*://[^/?#]+(?:/[^/?#]*)*?/([^/?#]+)/?(?:[?#].*)?$")
            .expect("video id regex is valid")
    })
}

// ---------------------------------------------------------------------------
// Video reference
// ---------------------------------------------------------------------------

/// An externally hosted avatar video, as authored in the flow table.
///
/// The full URL is kept verbatim; the player id is the URL's last path
/// segment and is resolved once when the reference is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    url: String,
    id: String,
}

impl VideoRef {
    pub fn parse(url: &str) -> Result<Self, ContentError> {
        let caps = video_id_regex()
            .captures(url.trim())
            .ok_or_else(|| ContentError::InvalidVideoUrl(url.to_string()))?;
        let id = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ContentError::InvalidVideoUrl(url.to_string()))?;

        Ok(Self {
            url: url.trim().to_string(),
            id,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Address of the embeddable player for this video.
    pub fn embed_url(&self, params: &EmbedParams) -> String {
        format!(
            "{PLAYER_BASE}/{}?h=0&badge=0&autopause=0&player_id=0&app_id=58479\
             &autoplay={}&loop={}&muted={}&controls={}\
             &transparent=0&portrait=0&title=0&byline=0",
            self.id,
            flag(params.autoplay),
            flag(params.looped),
            flag(params.muted),
            flag(params.controls),
        )
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

fn flag(on: bool) -> u8 {
    u8::from(on)
}

// ---------------------------------------------------------------------------
// Player parameters
// ---------------------------------------------------------------------------

/// Playback flags handed to the third-party player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedParams {
    pub autoplay: bool,
    pub looped: bool,
    pub muted: bool,
    pub controls: bool,
}

impl Default for EmbedParams {
    fn default() -> Self {
        Self {
            autoplay: true,
            looped: true,
            muted: true,
            controls: false,
        }
    }
}
