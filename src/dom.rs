use anyhow::Context as _;
use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink as _;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomError {
    #[error("no element matches {selector}")]
    NotFound { selector: String },
    #[error("invalid selector {selector}")]
    InvalidSelector { selector: String },
}

/// A parsed HTML document standing in for the browser's live DOM.
#[derive(Clone)]
pub struct Document {
    node: NodeRef,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            node: kuchiki::parse_html().one(html),
        }
    }

    /// The `<html>` element. The HTML parser always synthesizes one.
    pub fn root(&self) -> Result<NodeRef, DomError> {
        self.first("html")
    }

    pub fn by_id(&self, id: &str) -> Result<NodeRef, DomError> {
        self.first(&format!("#{id}"))
    }

    pub fn first(&self, selector: &str) -> Result<NodeRef, DomError> {
        self.select_all(selector)?
            .into_iter()
            .next()
            .ok_or_else(|| DomError::NotFound {
                selector: selector.to_string(),
            })
    }

    /// Every element matching `selector`, in document order.
    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeRef>, DomError> {
        let nodes = self
            .node
            .select(selector)
            .map_err(|()| DomError::InvalidSelector {
                selector: selector.to_string(),
            })?;
        Ok(nodes.map(|n| n.as_node().clone()).collect())
    }

    pub fn to_html(&self) -> anyhow::Result<String> {
        let mut out = Vec::new();
        self.node
            .serialize(&mut out)
            .context("serialize document")?;
        String::from_utf8(out).context("document html not utf-8")
    }
}

pub fn text(node: &NodeRef) -> String {
    node.text_contents()
}

/// Replaces all children of `node` with a single text node.
pub fn set_text(node: &NodeRef, text: &str) {
    let children: Vec<_> = node.children().collect();
    for child in children {
        child.detach();
    }
    node.append(NodeRef::new_text(text));
}

pub fn attribute(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    element.attributes.borrow().get(name).map(|s| s.to_string())
}

/// Class-attribute view of an element, `classList` style.
pub struct ClassList<'a> {
    node: &'a NodeRef,
}

impl<'a> ClassList<'a> {
    pub fn of(node: &'a NodeRef) -> Self {
        Self { node }
    }

    pub fn contains(&self, class: &str) -> bool {
        attribute(self.node, "class")
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Flips `class` and reports whether it is present afterwards.
    pub fn toggle(&self, class: &str) -> bool {
        let Some(element) = self.node.as_element() else {
            return false;
        };
        let mut attrs = element.attributes.borrow_mut();
        let current = attrs.get("class").unwrap_or("").to_string();
        let mut classes: Vec<&str> = current.split_whitespace().collect();

        let present = if let Some(pos) = classes.iter().position(|c| *c == class) {
            classes.remove(pos);
            false
        } else {
            classes.push(class);
            true
        };

        if classes.is_empty() {
            attrs.remove("class");
        } else {
            attrs.insert("class", classes.join(" "));
        }
        present
    }
}
