//! Turning stored upload values into protected download links for display.

use askama::Template;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::link::LinkSigner;
use crate::rewrite::ReferenceRewriter;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

/// What a render call produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendered {
    /// Not a display context: values are handed back untouched.
    PassThrough { values: Vec<String> },
    Markup { markup: String },
    /// Nothing resolved. Callers must not emit a wrapper element.
    Empty,
}

/// One protected link ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayLink {
    pub name: String,
    pub url: String,
    pub expires: i64,
}

#[derive(Template)]
#[template(path = "download_links.html")]
struct DownloadLinksTemplate {
    links: Vec<DisplayLink>,
}

#[derive(Debug, Clone)]
pub struct LinkRenderer {
    rewriter: ReferenceRewriter,
    signer: LinkSigner,
    site_url: Url,
}

impl LinkRenderer {
    pub fn new(rewriter: ReferenceRewriter, signer: LinkSigner, site_url: Url) -> Self {
        Self {
            rewriter,
            signer,
            site_url,
        }
    }

    pub fn signer(&self) -> &LinkSigner {
        &self.signer
    }

    pub fn site_url(&self) -> &Url {
        &self.site_url
    }

    /// Render `values` for a human, or pass them through when `display` is
    /// false.
    pub fn render(
        &self,
        values: Vec<String>,
        display: bool,
        now: OffsetDateTime,
    ) -> Result<Rendered, RenderError> {
        if !display {
            return Ok(Rendered::PassThrough { values });
        }

        let links = self.links(&values, now);
        if links.is_empty() {
            return Ok(Rendered::Empty);
        }

        let markup = DownloadLinksTemplate { links }.render()?;
        Ok(Rendered::Markup { markup })
    }

    /// Mint one link per value that resolves to a private file, in order.
    ///
    /// Legacy values are relocated on the way; values that resolve to
    /// nothing are skipped.
    pub fn links(&self, values: &[String], now: OffsetDateTime) -> Vec<DisplayLink> {
        values
            .iter()
            .filter_map(|value| {
                let relative = self.rewriter.resolve(value);
                if relative.is_none() {
                    tracing::debug!(value = %value, "value does not resolve to a private file");
                }
                relative
            })
            .map(|relative| {
                let link = self.signer.mint(&relative, now);
                DisplayLink {
                    name: relative.file_name().to_string(),
                    url: link.to_url(&self.site_url).to_string(),
                    expires: link.expires,
                }
            })
            .collect()
    }
}
