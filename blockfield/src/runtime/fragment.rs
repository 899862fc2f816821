//! Rendered output of a view.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A piece of rendered HTML plus the resources it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub content: String,
    /// Resource URLs or inline snippets, deduplicated, in first-seen order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

impl Fragment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            resources: Vec::new(),
        }
    }

    pub fn add_content(&mut self, content: &str) {
        self.content.push_str(content);
    }

    pub fn add_resource(&mut self, resource: impl Into<String>) {
        let resource = resource.into();
        if !self.resources.contains(&resource) {
            self.resources.push(resource);
        }
    }

    /// Append `other`'s content and merge its resources.
    pub fn add_fragment(&mut self, other: Fragment) {
        self.content.push_str(&other.content);
        for resource in other.resources {
            self.add_resource(resource);
        }
    }

    /// Placeholder shown where a child cannot render the requested view.
    pub fn error_indicator(block_type: &str, view_name: &str) -> Self {
        Self::new(format!(
            "<div class=\"block-error\" data-block-type=\"{}\">no view '{}'</div>",
            escape_html(block_type),
            escape_html(view_name)
        ))
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Escape text for use in HTML content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
