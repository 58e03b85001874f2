use crate::AssetError;
use etude_common::TextureHandle;
use image::imageops::FilterType;
use image::RgbaImage;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

const PLACEHOLDER_TEXEL: [u8; 4] = [128, 128, 128, 255];

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// A 1x1 texture of a single texel.
    pub fn solid(label: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            label: label.into(),
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    fn from_image(label: String, image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            label,
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        self.pixels.get(i..i + 4)?.try_into().ok()
    }
}

/// A stored texture: a flat image or six square cube faces in the order
/// +X, -X, +Y, -Y, +Z, -Z.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Texture {
    Flat(TextureData),
    Cube(Vec<TextureData>),
}

impl Texture {
    pub fn is_cube(&self) -> bool {
        matches!(self, Texture::Cube(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Texture::Flat(t) => &t.label,
            Texture::Cube(faces) => faces.first().map_or("", |f| f.label.as_str()),
        }
    }
}

/// Content-addressed texture registry.
///
/// Handles are derived from a SHA-256 digest of the source bytes, so loading
/// the same file twice yields one entry.
#[derive(Debug, Clone, Default)]
pub struct TextureStore {
    textures: BTreeMap<TextureHandle, Texture>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and decode an image file.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<TextureHandle, AssetError> {
        let path = path.as_ref();
        let bytes = read(path)?;
        let handle = content_handle("flat", &[&bytes]);
        if self.textures.contains_key(&handle) {
            tracing::debug!(path = %path.display(), ?handle, "texture already loaded");
            return Ok(handle);
        }
        let image = decode(path, &bytes)?;
        let data = TextureData::from_image(label_of(path), image);
        tracing::debug!(
            path = %path.display(),
            width = data.width,
            height = data.height,
            "texture loaded"
        );
        self.textures.insert(handle, Texture::Flat(data));
        Ok(handle)
    }

    /// Load six images as a cube texture. Faces are resized to the square
    /// size of the first face when they differ.
    pub fn load_cube<P: AsRef<Path>>(&mut self, paths: [P; 6]) -> Result<TextureHandle, AssetError> {
        let mut sources = Vec::with_capacity(6);
        for p in &paths {
            let path = p.as_ref();
            sources.push((path, read(path)?));
        }
        let slices: Vec<&[u8]> = sources.iter().map(|(_, b)| b.as_slice()).collect();
        let handle = content_handle("cube", &slices);
        if self.textures.contains_key(&handle) {
            return Ok(handle);
        }

        let mut side = 0;
        let mut faces = Vec::with_capacity(6);
        for (i, (path, bytes)) in sources.iter().enumerate() {
            let mut image = decode(path, bytes)?;
            if i == 0 {
                side = image.width().min(image.height()).max(1);
            }
            if image.dimensions() != (side, side) {
                tracing::debug!(
                    path = %path.display(),
                    from = ?image.dimensions(),
                    side,
                    "resizing cube face"
                );
                image = image::imageops::resize(&image, side, side, FilterType::Triangle);
            }
            faces.push(TextureData::from_image(label_of(path), image));
        }
        tracing::debug!(?handle, side, "cube texture loaded");
        self.textures.insert(handle, Texture::Cube(faces));
        Ok(handle)
    }

    /// A 1x1 grey texture standing in for one that failed to load.
    pub fn placeholder(&mut self) -> TextureHandle {
        let handle = content_handle("placeholder", &[&PLACEHOLDER_TEXEL]);
        self.textures
            .entry(handle)
            .or_insert_with(|| Texture::Flat(TextureData::solid("placeholder", PLACEHOLDER_TEXEL)));
        handle
    }

    /// Cube counterpart of [`TextureStore::placeholder`].
    pub fn placeholder_cube(&mut self) -> TextureHandle {
        let handle = content_handle("placeholder-cube", &[&PLACEHOLDER_TEXEL]);
        self.textures.entry(handle).or_insert_with(|| {
            Texture::Cube(vec![TextureData::solid("placeholder", PLACEHOLDER_TEXEL); 6])
        });
        handle
    }

    pub fn get(&self, handle: TextureHandle) -> Result<&Texture, AssetError> {
        self.textures.get(&handle).ok_or(AssetError::NotFound(handle))
    }

    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.textures.contains_key(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureHandle, &Texture)> {
        self.textures.iter().map(|(h, t)| (*h, t))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

fn read(path: &Path) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn decode(path: &Path, bytes: &[u8]) -> Result<RgbaImage, AssetError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })
}

fn label_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn content_handle(kind: &str, parts: &[&[u8]]) -> TextureHandle {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&result[..8]);
    TextureHandle(u64::from_le_bytes(bytes))
}
