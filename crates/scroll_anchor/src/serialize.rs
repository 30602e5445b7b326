//! Session-restore form of a scroll anchor, and the selector that finds
//! the anchor node again.

use anyhow::{Context as _, Result};
use log::debug;
use selectors::bloom::BloomFilter;
use serde::{Deserialize, Serialize};
use std::hash::{DefaultHasher, Hash as _, Hasher as _};
use strata_geometry::PointF;
use strata_layout_tree::{DomNodeId, DomTree, ElementData};

/// Longest selector [`compute_unique_selector`] will produce.
pub const MAX_SERIALIZED_SELECTOR_LENGTH: usize = 500;

/// A scroll anchor that survives navigation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedAnchor {
    /// Selector resolving to exactly the anchor node. Empty means invalid.
    pub selector: String,
    /// The anchor's corner relative to the scroller's visible rect.
    pub relative_offset: PointF,
    /// Reserved for a content similarity hash. Always 0.
    pub simhash: u64,
}

impl SerializedAnchor {
    pub fn new(selector: String, relative_offset: PointF) -> Self {
        Self {
            selector,
            relative_offset,
            simhash: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.selector.is_empty()
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("serializing scroll anchor")
    }

    /// # Errors
    ///
    /// Returns an error if `json` is not a serialized anchor.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing scroll anchor")
    }
}

fn has_unique_id(dom: &DomTree, data: &ElementData) -> Option<String> {
    data.id
        .as_deref()
        .filter(|id| !id.is_empty() && !dom.contains_multiple_elements_with_id(id))
        .map(str::to_owned)
}

fn identifier(prefix: &str, name: &str) -> String {
    let mut serialized = String::from(prefix);
    if cssparser::serialize_identifier(name, &mut serialized).is_err() {
        serialized.push_str(name);
    }
    serialized
}

fn class_hash(class: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    class.hash(&mut hasher);
    hasher.finish() as u32
}

/// The cheapest simple selector that tells `element` apart from its
/// siblings: a document-unique id, then a tag name no sibling shares, then
/// the first class no sibling may carry, then `:nth-child`.
fn unique_simple_selector_among_siblings(dom: &DomTree, element: DomNodeId) -> Option<String> {
    let data = dom.element(element)?;
    if let Some(id) = has_unique_id(dom, data) {
        return Some(identifier("#", &id));
    }

    let siblings: Vec<&ElementData> = dom
        .parent(element)
        .map(|parent| {
            dom.element_children(parent)
                .filter(|sibling| *sibling != element)
                .filter_map(|sibling| dom.element(sibling))
                .collect()
        })
        .unwrap_or_default();

    if siblings.iter().all(|sibling| sibling.tag_name != data.tag_name) {
        return Some(identifier("", &data.tag_name));
    }

    if !data.classes.is_empty() {
        let mut filter = BloomFilter::new();
        for class in siblings.iter().flat_map(|sibling| sibling.classes.iter()) {
            filter.insert_hash(class_hash(class));
        }
        if let Some(class) = data
            .classes
            .iter()
            .find(|class| !filter.might_contain_hash(class_hash(class)))
        {
            return Some(identifier(".", class));
        }
    }

    dom.element_index(element)
        .map(|index| format!(":nth-child({index})"))
}

/// A selector matching exactly `anchor` (or, for a text node, its parent
/// element), rooted at the nearest ancestor with a document-unique id or at
/// the root element.
///
/// Returns `None` for pseudo-elements, nodes in shadow trees, and whenever
/// the selector would be longer than `max_length`.
pub fn compute_unique_selector(dom: &DomTree, anchor: DomNodeId, max_length: usize) -> Option<String> {
    if dom.is_pseudo_element(anchor) || dom.is_in_shadow_tree(anchor) {
        debug!("{anchor:?} cannot be reached by a document selector");
        return None;
    }
    let _span = tracing::debug_span!("compute_unique_selector").entered();

    let mut current = if dom.element(anchor).is_some() {
        Some(anchor)
    } else {
        dom.parent_element(anchor)
    };
    let mut parts = Vec::new();
    while let Some(element) = current {
        parts.push(unique_simple_selector_among_siblings(dom, element)?);
        let rooted = dom
            .element(element)
            .is_some_and(|data| has_unique_id(dom, data).is_some());
        if rooted {
            break;
        }
        current = dom.parent_element(element);
    }
    if parts.is_empty() {
        return None;
    }

    parts.reverse();
    let selector = parts.join(">");
    if selector.len() > max_length {
        debug!("selector for {anchor:?} is {} characters long", selector.len());
        return None;
    }
    Some(selector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_layout_tree::PseudoId;

    struct Page {
        dom: DomTree,
        body: DomNodeId,
    }

    fn page() -> Result<Page> {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut dom = DomTree::new();
        let html = dom.create_element("html");
        dom.append_child(dom.document(), html)?;
        let body = dom.create_element("body");
        dom.append_child(html, body)?;
        Ok(Page { dom, body })
    }

    fn child(dom: &mut DomTree, parent: DomNodeId, tag: &str) -> Result<DomNodeId> {
        let element = dom.create_element(tag);
        dom.append_child(parent, element)?;
        Ok(element)
    }

    #[test]
    fn unique_id_ends_the_walk() -> Result<()> {
        let Page { mut dom, body } = page()?;
        child(&mut dom, body, "div")?;
        let anchor = child(&mut dom, body, "div")?;
        dom.add_class(anchor, "a")?;
        dom.set_id(anchor, "x")?;
        assert_eq!(
            compute_unique_selector(&dom, anchor, MAX_SERIALIZED_SELECTOR_LENGTH).as_deref(),
            Some("#x")
        );
        Ok(())
    }

    #[test]
    fn falls_back_through_tag_class_and_position() -> Result<()> {
        let Page { mut dom, body } = page()?;
        let ancestor = child(&mut dom, body, "div")?;
        dom.set_id(ancestor, "ancestor")?;
        child(&mut dom, ancestor, "div")?;
        let span = child(&mut dom, ancestor, "span")?;
        let classed = child(&mut dom, ancestor, "div")?;
        dom.add_class(classed, "foo")?;
        dom.add_class(classed, "barbaz")?;
        let sibling = child(&mut dom, ancestor, "div")?;
        dom.add_class(sibling, "foo")?;
        let plain = child(&mut dom, ancestor, "div")?;

        let selector = |node| compute_unique_selector(&dom, node, MAX_SERIALIZED_SELECTOR_LENGTH);
        assert_eq!(selector(span).as_deref(), Some("#ancestor>span"));
        assert_eq!(selector(classed).as_deref(), Some("#ancestor>.barbaz"));
        assert_eq!(selector(plain).as_deref(), Some("#ancestor>:nth-child(5)"));
        Ok(())
    }

    #[test]
    fn duplicate_ids_are_not_roots() -> Result<()> {
        let Page { mut dom, body } = page()?;
        let first = child(&mut dom, body, "div")?;
        dom.set_id(first, "dup")?;
        let second = child(&mut dom, body, "div")?;
        dom.set_id(second, "dup")?;
        let anchor = child(&mut dom, second, "p")?;
        assert_eq!(
            compute_unique_selector(&dom, anchor, MAX_SERIALIZED_SELECTOR_LENGTH).as_deref(),
            Some("html>body>:nth-child(2)>p")
        );
        Ok(())
    }

    #[test]
    fn text_nodes_use_their_parent() -> Result<()> {
        let Page { mut dom, body } = page()?;
        let paragraph = child(&mut dom, body, "p")?;
        dom.set_id(paragraph, "para")?;
        let text = dom.create_text("hello");
        dom.append_child(paragraph, text)?;
        assert_eq!(
            compute_unique_selector(&dom, text, MAX_SERIALIZED_SELECTOR_LENGTH).as_deref(),
            Some("#para")
        );
        Ok(())
    }

    #[test]
    fn unreachable_nodes_have_no_selector() -> Result<()> {
        let Page { mut dom, body } = page()?;
        let host = child(&mut dom, body, "div")?;
        let before = dom.create_pseudo_element(host, PseudoId::Before)?;
        assert_eq!(compute_unique_selector(&dom, before, MAX_SERIALIZED_SELECTOR_LENGTH), None);

        let root = dom.attach_shadow_root(host)?;
        let shadowed = child(&mut dom, root, "div")?;
        assert_eq!(compute_unique_selector(&dom, shadowed, MAX_SERIALIZED_SELECTOR_LENGTH), None);
        Ok(())
    }

    #[test]
    fn long_selectors_are_rejected() -> Result<()> {
        let Page { mut dom, body } = page()?;
        let mut parent = body;
        for _ in 0..100 {
            parent = child(&mut dom, parent, "section")?;
        }
        assert!(compute_unique_selector(&dom, parent, MAX_SERIALIZED_SELECTOR_LENGTH).is_none());
        assert!(compute_unique_selector(&dom, parent, 10_000).is_some());
        Ok(())
    }

    #[test]
    fn identifiers_are_escaped() -> Result<()> {
        let Page { mut dom, body } = page()?;
        let anchor = child(&mut dom, body, "div")?;
        dom.set_id(anchor, "1st")?;
        assert_eq!(
            compute_unique_selector(&dom, anchor, MAX_SERIALIZED_SELECTOR_LENGTH).as_deref(),
            Some("#\\31 st")
        );
        Ok(())
    }

    #[test]
    fn anchors_round_trip_through_json() -> Result<()> {
        let anchor = SerializedAnchor::new("#x".to_owned(), PointF::new(0.0, -50.0));
        let restored = SerializedAnchor::from_json(&anchor.to_json()?)?;
        assert_eq!(restored, anchor);
        assert!(restored.is_valid());
        assert!(!SerializedAnchor::default().is_valid());
        assert!(SerializedAnchor::from_json("{\"selector\": 3}").is_err());
        Ok(())
    }
}
