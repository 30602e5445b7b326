//! The `selectors` crate's element trait over the layout-tree DOM, and the
//! `querySelectorAll` that restoration resolves serialized anchors with.

use anyhow::{Result, anyhow};
use cssparser::{CowRcStr, ParseError, Parser, ParserInput, SourceLocation, ToCss};
use selectors::attr::{AttrSelectorOperation, AttrSelectorOperator, CaseSensitivity, NamespaceConstraint};
use selectors::matching::{
    ElementSelectorFlags, IgnoreNthChildForInvalidation, MatchingContext, MatchingMode,
    NeedsSelectorFlags, QuirksMode, matches_selector,
};
use selectors::parser::{ParseRelative, SelectorList, SelectorParseErrorKind};
use selectors::{NthIndexCache, OpaqueElement};
use std::borrow::Borrow;
use std::fmt;
use strata_layout_tree::{DomNodeId, DomTree, ElementData, NodeData};

/// An element of a [`DomTree`] as seen by selector matching.
#[derive(Clone, Copy)]
pub struct DomElement<'dom> {
    node: DomNodeId,
    dom: &'dom DomTree,
}

impl fmt::Debug for DomElement<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DomElement")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl<'dom> DomElement<'dom> {
    pub fn new(node: DomNodeId, dom: &'dom DomTree) -> Self {
        Self { node, dom }
    }

    pub fn node(&self) -> DomNodeId {
        self.node
    }

    fn data(&self) -> Option<&'dom ElementData> {
        self.dom.element(self.node)
    }

    fn wrap(&self, node: DomNodeId) -> Self {
        Self::new(node, self.dom)
    }

    fn sibling_elements(&self) -> Vec<DomNodeId> {
        self.dom
            .parent(self.node)
            .map(|parent| self.dom.element_children(parent).collect())
            .unwrap_or_default()
    }

    /// The two attributes the DOM models: `id` and `class`.
    fn attribute(&self, name: &str) -> Option<String> {
        let data = self.data()?;
        match name {
            "id" => data.id.clone(),
            "class" if !data.classes.is_empty() => Some(data.classes.join(" ")),
            _ => None,
        }
    }

    fn parent_is(&self, test: impl Fn(&NodeData) -> bool) -> bool {
        self.dom
            .parent(self.node)
            .and_then(|parent| self.dom.node(parent))
            .is_some_and(|parent| test(&parent.data))
    }
}

fn attribute_value_matches(
    operator: AttrSelectorOperator,
    attribute: &str,
    value: &str,
    case_sensitivity: CaseSensitivity,
) -> bool {
    let (attribute, value) = match case_sensitivity {
        CaseSensitivity::CaseSensitive => (attribute.to_owned(), value.to_owned()),
        CaseSensitivity::AsciiCaseInsensitive => (attribute.to_ascii_lowercase(), value.to_ascii_lowercase()),
    };
    match operator {
        AttrSelectorOperator::Equal => attribute == value,
        AttrSelectorOperator::Includes => attribute.split_whitespace().any(|part| part == value),
        AttrSelectorOperator::DashMatch => {
            attribute == value || attribute.starts_with(&format!("{value}-"))
        }
        AttrSelectorOperator::Prefix => !value.is_empty() && attribute.starts_with(&value),
        AttrSelectorOperator::Suffix => !value.is_empty() && attribute.ends_with(&value),
        AttrSelectorOperator::Substring => !value.is_empty() && attribute.contains(&value),
    }
}

impl selectors::Element for DomElement<'_> {
    type Impl = SelectorImpl;

    fn opaque(&self) -> OpaqueElement {
        self.dom
            .node(self.node)
            .map_or_else(|| OpaqueElement::new(self.dom), OpaqueElement::new)
    }

    fn parent_element(&self) -> Option<Self> {
        self.dom.parent_element(self.node).map(|parent| self.wrap(parent))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        self.parent_is(|data| matches!(data, NodeData::ShadowRoot))
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        let mut current = self.dom.parent(self.node);
        while let Some(node) = current {
            if matches!(self.dom.node(node)?.data, NodeData::ShadowRoot) {
                return self.dom.parent(node).map(|host| self.wrap(host));
            }
            current = self.dom.parent(node);
        }
        None
    }

    fn is_pseudo_element(&self) -> bool {
        self.dom.is_pseudo_element(self.node)
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let siblings = self.sibling_elements();
        let index = siblings.iter().position(|sibling| *sibling == self.node)?;
        index
            .checked_sub(1)
            .and_then(|previous| siblings.get(previous))
            .map(|sibling| self.wrap(*sibling))
    }

    fn next_sibling_element(&self) -> Option<Self> {
        let siblings = self.sibling_elements();
        let index = siblings.iter().position(|sibling| *sibling == self.node)?;
        siblings.get(index + 1).map(|sibling| self.wrap(*sibling))
    }

    fn first_element_child(&self) -> Option<Self> {
        self.dom
            .element_children(self.node)
            .next()
            .map(|child| self.wrap(child))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.data().is_some_and(|data| data.tag_name == local_name)
    }

    fn has_namespace(&self, _ns: &()) -> bool {
        true
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.data().map(|data| &data.tag_name) == other.data().map(|data| &data.tag_name)
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&()>,
        local_name: &AttrString,
        operation: &AttrSelectorOperation<&AttrString>,
    ) -> bool {
        if !matches!(ns, NamespaceConstraint::Specific(())) {
            return false;
        }
        let Some(attribute) = self.attribute(&local_name.0) else {
            return false;
        };
        match operation {
            AttrSelectorOperation::Exists => true,
            AttrSelectorOperation::WithValue {
                operator,
                case_sensitivity,
                value,
            } => attribute_value_matches(*operator, &attribute, &value.0, *case_sensitivity),
        }
    }

    fn match_non_ts_pseudo_class(
        &self,
        _pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(
        &self,
        _pe: &PseudoElement,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        false
    }

    fn is_html_slot_element(&self) -> bool {
        self.has_local_name("slot")
    }

    fn has_id(&self, id: &AttrString, case_sensitivity: CaseSensitivity) -> bool {
        self.data()
            .and_then(|data| data.id.as_deref())
            .is_some_and(|own| case_sensitivity.eq(own.as_bytes(), id.0.as_bytes()))
    }

    fn has_class(&self, name: &AttrString, case_sensitivity: CaseSensitivity) -> bool {
        self.data().is_some_and(|data| {
            data.classes
                .iter()
                .any(|class| case_sensitivity.eq(class.as_bytes(), name.0.as_bytes()))
        })
    }

    fn imported_part(&self, _name: &AttrString) -> Option<AttrString> {
        None
    }

    fn is_part(&self, _name: &AttrString) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.dom.children(self.node).all(|child| {
            self.dom.node(child).is_none_or(|node| match &node.data {
                NodeData::Element(_) => false,
                NodeData::Text(text) => text.trim().is_empty(),
                NodeData::Document | NodeData::PseudoElement(_) | NodeData::ShadowRoot => true,
            })
        })
    }

    fn is_root(&self) -> bool {
        self.parent_is(|data| matches!(data, NodeData::Document))
    }
}

/// String wrapper that implements `ToCss`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AttrString(pub String);

impl From<&str> for AttrString {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Borrow<str> for AttrString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl ToCss for AttrString {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        cssparser::serialize_string(&self.0, dest)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SelectorImpl;

impl selectors::SelectorImpl for SelectorImpl {
    type ExtraMatchingData<'extra> = ();
    type AttrValue = AttrString;
    type Identifier = AttrString;
    type LocalName = AttrString;
    type NamespacePrefix = AttrString;
    type NamespaceUrl = ();
    type BorrowedLocalName = str;
    type BorrowedNamespaceUrl = ();
    type NonTSPseudoClass = NonTSPseudoClass;
    type PseudoElement = PseudoElement;
}

/// No non-tree-structural pseudo-classes are supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonTSPseudoClass {}

impl selectors::parser::NonTSPseudoClass for NonTSPseudoClass {
    type Impl = SelectorImpl;

    fn is_active_or_hover(&self) -> bool {
        match *self {}
    }

    fn is_user_action_state(&self) -> bool {
        match *self {}
    }
}

impl ToCss for NonTSPseudoClass {
    fn to_css<W>(&self, _dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        match *self {}
    }
}

/// Pseudo-elements never match: they are not part of the DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoElement {}

impl selectors::parser::PseudoElement for PseudoElement {
    type Impl = SelectorImpl;
}

impl ToCss for PseudoElement {
    fn to_css<W>(&self, _dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        match *self {}
    }
}

struct SelectorParser;

impl<'i> selectors::parser::Parser<'i> for SelectorParser {
    type Impl = SelectorImpl;
    type Error = SelectorParseErrorKind<'i>;

    fn parse_non_ts_pseudo_class(
        &self,
        location: SourceLocation,
        name: CowRcStr<'i>,
    ) -> Result<NonTSPseudoClass, ParseError<'i, SelectorParseErrorKind<'i>>> {
        Err(location.new_custom_error(SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name)))
    }

    fn parse_pseudo_element(
        &self,
        location: SourceLocation,
        name: CowRcStr<'i>,
    ) -> Result<PseudoElement, ParseError<'i, SelectorParseErrorKind<'i>>> {
        Err(location.new_custom_error(SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name)))
    }

    fn parse_non_ts_functional_pseudo_class<'t>(
        &self,
        name: CowRcStr<'i>,
        parser: &mut Parser<'i, 't>,
    ) -> Result<NonTSPseudoClass, ParseError<'i, SelectorParseErrorKind<'i>>> {
        Err(parser.new_custom_error(SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name)))
    }

    fn default_namespace(&self) -> Option<()> {
        None
    }

    fn namespace_for_prefix(&self, _prefix: &AttrString) -> Option<()> {
        None
    }
}

/// Elements of the document tree scope matching `selector`, in tree order.
///
/// # Errors
///
/// Returns an error if `selector` does not parse.
pub fn query_selector_all(dom: &DomTree, selector: &str) -> Result<Vec<DomNodeId>> {
    let mut input = ParserInput::new(selector);
    let mut parser = Parser::new(&mut input);
    let selector_list = SelectorList::<SelectorImpl>::parse(&SelectorParser, &mut parser, ParseRelative::No)
        .map_err(|error| anyhow!("invalid selector {selector:?}: {:?}", error.kind))?;

    let mut nth_index_cache = NthIndexCache::default();
    let mut context = MatchingContext::new(
        MatchingMode::Normal,
        None,
        &mut nth_index_cache,
        QuirksMode::NoQuirks,
        NeedsSelectorFlags::No,
        IgnoreNthChildForInvalidation::No,
    );
    Ok(dom
        .document_elements()
        .into_iter()
        .filter(|node| {
            let element = DomElement::new(*node, dom);
            selector_list
                .0
                .iter()
                .any(|selector| matches_selector(selector, 0, None, &element, &mut context))
        })
        .collect())
}
