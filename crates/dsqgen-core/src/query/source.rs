use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{DsqgenError, Result};

/// Templates compiled into the crate.
macro_rules! bundled {
    ($id:literal) => {
        (
            $id,
            include_str!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/resources/query_templates/query",
                $id,
                ".tpl"
            )),
        )
    };
}

const BUNDLED: &[(u8, &str)] = &[
    bundled!(3),
    bundled!(6),
    bundled!(7),
    bundled!(20),
    bundled!(52),
    bundled!(93),
];

/// Where query template text comes from.
///
/// `load` returns `Ok(None)` when the source simply has no template for the
/// id, and an error only when one exists but cannot be read.
pub trait TemplateSource: Send + Sync {
    fn load(&self, id: u8) -> Result<Option<String>>;

    /// Human-readable description for logs and CLI output.
    fn describe(&self) -> String;
}

/// The demo templates shipped inside the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledTemplates;

impl BundledTemplates {
    pub fn ids() -> impl Iterator<Item = u8> {
        BUNDLED.iter().map(|(id, _)| *id)
    }
}

impl TemplateSource for BundledTemplates {
    fn load(&self, id: u8) -> Result<Option<String>> {
        Ok(BUNDLED
            .iter()
            .find(|(bundled, _)| *bundled == id)
            .map(|(_, text)| text.to_string()))
    }

    fn describe(&self) -> String {
        "bundled templates".to_string()
    }
}

/// A directory of `query<N>.tpl` files.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    dir: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(DsqgenError::Config {
                message: format!("Template directory {} does not exist", dir.display()),
            });
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: u8) -> PathBuf {
        self.dir.join(format!("query{}.tpl", id))
    }
}

impl TemplateSource for DirectoryTemplates {
    fn load(&self, id: u8) -> Result<Option<String>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|e| DsqgenError::TemplateSource {
            query: id,
            path: path.display().to_string(),
            source: e,
        })?;
        // Templates are plain ASCII in practice; tolerate stray latin-1 bytes.
        Ok(Some(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => crate::distribution::format::decode_latin1(e.as_bytes()),
        }))
    }

    fn describe(&self) -> String {
        format!("templates in {}", self.dir.display())
    }
}

/// In-memory templates, keyed by query id.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    templates: BTreeMap<u8, String>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: u8, text: impl Into<String>) -> Self {
        self.insert(id, text);
        self
    }

    pub fn insert(&mut self, id: u8, text: impl Into<String>) {
        self.templates.insert(id, text.into());
    }
}

impl TemplateSource for MemoryTemplates {
    fn load(&self, id: u8) -> Result<Option<String>> {
        Ok(self.templates.get(&id).cloned())
    }

    fn describe(&self) -> String {
        format!("{} in-memory templates", self.templates.len())
    }
}

/// Tries each source in order; the first one that has the id wins.
pub struct LayeredTemplates {
    layers: Vec<Box<dyn TemplateSource>>,
}

impl LayeredTemplates {
    pub fn new(layers: Vec<Box<dyn TemplateSource>>) -> Self {
        Self { layers }
    }

    /// A directory, falling back to the bundled templates.
    pub fn over_bundled(dir: DirectoryTemplates) -> Self {
        Self::new(vec![Box::new(dir), Box::new(BundledTemplates)])
    }
}

impl TemplateSource for LayeredTemplates {
    fn load(&self, id: u8) -> Result<Option<String>> {
        for layer in &self.layers {
            if let Some(text) = layer.load(id)? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }

    fn describe(&self) -> String {
        self.layers
            .iter()
            .map(|layer| layer.describe())
            .collect::<Vec<_>>()
            .join(", then ")
    }
}
