use crate::api::types::ImageHandle;

/// What an asset decodes to. Inferred from the URL when not given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Spritesheet,
    Json,
    Binary,
    Audio,
}

impl AssetKind {
    /// Infer the kind from a URL's extension (query and fragment ignored)
    /// or from a `data:` URL's media type.
    pub fn from_url(url: &str) -> AssetKind {
        if let Some(rest) = url.strip_prefix("data:") {
            let media = rest.split([';', ',']).next().unwrap_or_default();
            return if media.starts_with("image/") {
                AssetKind::Image
            } else if media.starts_with("audio/") {
                AssetKind::Audio
            } else if media.ends_with("json") {
                AssetKind::Json
            } else {
                AssetKind::Binary
            };
        }

        let path = url.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or_default();
        let ext = match file.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return AssetKind::Binary,
        };
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "bmp" => AssetKind::Image,
            "json" => AssetKind::Json,
            "mp3" | "wav" | "ogg" | "m4a" | "aac" | "flac" => AssetKind::Audio,
            _ => AssetKind::Binary,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, AssetKind::Image | AssetKind::Spritesheet)
    }
}

/// Decoded asset data, produced by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetPayload {
    Image { handle: ImageHandle, width: u32, height: u32 },
    Json(serde_json::Value),
    Binary(Vec<u8>),
}

/// One asset record. `payload` is only meaningful once `loaded` is true.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: String,
    pub url: String,
    pub kind: AssetKind,
    pub loaded: bool,
    pub error: Option<String>,
    pub payload: Option<AssetPayload>,
}

impl Asset {
    pub(crate) fn pending(id: &str, url: &str, kind: AssetKind) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            kind,
            loaded: false,
            error: None,
            payload: None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        !self.loaded && self.error.is_none()
    }

    /// Image handle and pixel size, if this is a loaded image.
    pub fn image(&self) -> Option<(ImageHandle, u32, u32)> {
        if !self.loaded {
            return None;
        }
        match self.payload {
            Some(AssetPayload::Image { handle, width, height }) => Some((handle, width, height)),
            _ => None,
        }
    }

    pub fn json(&self) -> Option<&serde_json::Value> {
        if !self.loaded {
            return None;
        }
        match &self.payload {
            Some(AssetPayload::Json(value)) => Some(value),
            _ => None,
        }
    }
}
