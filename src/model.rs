use serde::Serialize;

/// A file exactly as the user picked it.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    /// Declared media type, e.g. `image/png`
    pub media_type: String,
    pub file_name: String,
}

impl ImageAsset {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        ImageAsset {
            bytes,
            media_type: media_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Guess the media type from a file name extension.
    ///
    /// Unknown extensions map to `application/octet-stream`; the decoder
    /// sniffs the real format from the bytes anyway.
    pub fn media_type_for(file_name: &str) -> &'static str {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "bmp" => "image/bmp",
            _ => "application/octet-stream",
        }
    }
}

/// JPEG produced by the preprocessor, ready for upload.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Carried over from the source asset
    pub file_name: String,
}

impl ProcessedImage {
    pub const MEDIA_TYPE: &'static str = "image/jpeg";
}

pub type IngredientName = String;
pub type RecipeName = String;

/// Ingredient names in first-seen order, duplicates dropped by exact match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IngredientSet(Vec<IngredientName>);

impl IngredientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name` unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, name: impl Into<IngredientName>) -> bool {
        let name = name.into();
        if self.0.contains(&name) {
            return false;
        }
        self.0.push(name);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IngredientName> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[IngredientName] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<IngredientName> {
        self.0
    }
}

impl<S: Into<IngredientName>> FromIterator<S> for IngredientSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = IngredientSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

impl<'a> IntoIterator for &'a IngredientSet {
    type Item = &'a IngredientName;
    type IntoIter = std::slice::Iter<'a, IngredientName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
