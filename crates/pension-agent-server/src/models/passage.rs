use serde::Serialize;

pub const DEFAULT_TITLE: &str = "Sin título";
pub const DEFAULT_PUBLISHED: &str = "Fecha no especificada";
pub const DEFAULT_SOURCE_DOMAIN: &str = "Dominio no especificado";
pub const DEFAULT_URL: &str = "#";

/// Passage returned by the vector index. Read-only once retrieved.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Passage {
    pub id: String,
    pub score: f32,
    pub title: Option<String>,
    pub published: Option<String>,
    pub source_domain: Option<String>,
    pub url: Option<String>,
    pub content: String,
}

impl Passage {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    pub fn published(&self) -> &str {
        self.published.as_deref().unwrap_or(DEFAULT_PUBLISHED)
    }

    pub fn source_domain(&self) -> &str {
        self.source_domain.as_deref().unwrap_or(DEFAULT_SOURCE_DOMAIN)
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_URL)
    }
}
