use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::MediaError;

pub const MEDIA_ID_LEN: usize = 11;

/// A validated 11-character video id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaId(String);

impl MediaId {
    /// Extract a video id from whatever the user pasted: a bare id, a
    /// watch/embed/shorts/live link, or a short `youtu.be` link. The scheme
    /// may be omitted.
    pub fn parse(input: &str) -> Result<Self, MediaError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MediaError::Empty);
        }
        if is_valid_id(input) {
            return Ok(Self(input.to_string()));
        }

        // `host:port/path` parses with the host as its scheme, so anything
        // without a host gets a second try with an explicit scheme.
        let url = match Url::parse(input) {
            Ok(url) if url.has_host() => url,
            _ => Url::parse(&format!("https://{input}"))
                .map_err(|_| MediaError::UnrecognisedUrl(input.to_string()))?,
        };

        let candidate = id_from_url(&url)
            .ok_or_else(|| MediaError::UnrecognisedUrl(input.to_string()))?;
        if is_valid_id(&candidate) {
            Ok(Self(candidate))
        } else {
            Err(MediaError::InvalidId(candidate))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }

    pub fn thumbnail_url(&self) -> String {
        format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", self.0)
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for MediaId {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MediaId {
    type Error = MediaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid_id(&value) {
            Ok(Self(value))
        } else {
            Err(MediaError::InvalidId(value))
        }
    }
}

impl From<MediaId> for String {
    fn from(id: MediaId) -> Self {
        id.0
    }
}

fn is_valid_id(s: &str) -> bool {
    s.len() == MEDIA_ID_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn id_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = ["www.", "m.", "music."]
        .iter()
        .find_map(|prefix| host.strip_prefix(prefix))
        .unwrap_or(host.as_str())
        .to_string();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    match host.as_str() {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" => match segments.next()? {
            "watch" => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            "embed" | "shorts" | "live" | "v" | "e" => segments.next().map(str::to_string),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn accepts_bare_id() {
        assert_eq!(MediaId::parse(ID).unwrap().as_str(), ID);
        assert_eq!(MediaId::parse("  dQw4w9WgXcQ\n").unwrap().as_str(), ID);
    }

    #[test]
    fn accepts_common_url_shapes() {
        let inputs = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42",
            "http://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ&list=RD",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "youtube.com:443/watch?v=dQw4w9WgXcQ",
            "www.youtube.com:443/embed/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
        ];
        for input in inputs {
            let id = MediaId::parse(input).unwrap_or_else(|e| panic!("{input}: {e}"));
            assert_eq!(id.as_str(), ID, "{input}");
        }
    }

    #[test]
    fn rejects_other_hosts() {
        assert!(matches!(
            MediaId::parse("https://vimeo.com/123456789"),
            Err(MediaError::UnrecognisedUrl(_))
        ));
        assert!(matches!(
            MediaId::parse("https://www.youtube.com/feed/subscriptions"),
            Err(MediaError::UnrecognisedUrl(_))
        ));
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(matches!(
            MediaId::parse("https://youtu.be/short"),
            Err(MediaError::InvalidId(id)) if id == "short"
        ));
        assert!(matches!(
            MediaId::parse("https://www.youtube.com/watch?v=dQw4w9WgXc!"),
            Err(MediaError::InvalidId(_))
        ));
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert_eq!(MediaId::parse("   "), Err(MediaError::Empty));
        assert!(MediaId::parse("not a url at all").is_err());
    }

    #[test]
    fn serde_validates() {
        let id: MediaId = serde_json::from_str("\"dQw4w9WgXcQ\"").unwrap();
        assert_eq!(id.as_str(), ID);
        assert!(serde_json::from_str::<MediaId>("\"nope\"").is_err());
    }
}
