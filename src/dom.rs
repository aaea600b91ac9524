use std::collections::HashMap;

use crate::{Error, Result};

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    node_type: NodeType,
}

/// Attribute order and name case are kept as parsed so serialized markup
/// (SVG `viewBox` and friends) survives a cache round trip unchanged.
#[derive(Debug, Clone)]
struct Element {
    tag_name: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Node arena rooted at a document node.
///
/// Nodes are never freed: `set_inner_html` and `remove_child` only detach,
/// so the arena grows with every replaced subtree for the life of the page.
/// A `NodeId` therefore stays valid (if unreachable) once handed out, which
/// keeps listener registrations keyed by it sound.
#[derive(Debug, Clone)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
    id_index: HashMap<String, NodeId>,
    layout_passes: u64,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
            layout_passes: 0,
        }
    }

    pub(crate) fn parse(html: &str) -> Result<Self> {
        parse_html(html)
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        let element = Element { tag_name, attrs };
        let id = self.create_node(Some(parent), NodeType::Element(element));
        if let Some(id_attr) = self
            .element(id)
            .and_then(|element| element.attr("id"))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
        {
            self.id_index.entry(id_attr).or_insert(id);
        }
        id
    }

    fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes[node_id.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node_id.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes[node_id.0].parent
    }

    pub(crate) fn children(&self, node_id: NodeId) -> &[NodeId] {
        &self.nodes[node_id.0].children
    }

    pub(crate) fn first_child(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes[node_id.0].children.first().copied()
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn element_ids(&self) -> Vec<(String, NodeId)> {
        let mut out = self
            .id_index
            .iter()
            .map(|(id, node)| (id.clone(), *node))
            .collect::<Vec<_>>();
        out.sort_by_key(|(_, node)| node.0);
        out
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|element| element.attr(name))
            .map(str::to_string)
    }

    /// Sets `name`; an empty value for `style` drops the attribute instead.
    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::MissingNode("attribute target is not an element".into()))?;
        let pos = element
            .attrs
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name));
        match pos {
            Some(pos) if value.is_empty() && name.eq_ignore_ascii_case("style") => {
                element.attrs.remove(pos);
            }
            Some(pos) => element.attrs[pos].1 = value.to_string(),
            None if value.is_empty() && name.eq_ignore_ascii_case("style") => {}
            None => element.attrs.push((name.to_string(), value.to_string())),
        }
        if name.eq_ignore_ascii_case("id") {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document | NodeType::Element(_) => {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            NodeType::Text(text) => text.clone(),
        }
    }

    pub(crate) fn inner_html(&self, node_id: NodeId) -> Result<String> {
        if self.element(node_id).is_none() {
            return Err(Error::MissingNode("innerHTML target is not an element".into()));
        }
        let mut out = String::new();
        for child in &self.nodes[node_id.0].children {
            self.dump_node(*child, &mut out);
        }
        Ok(out)
    }

    pub(crate) fn outer_html(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.dump_node(node_id, &mut out);
        out
    }

    /// Replaces every child of `node_id` with the parsed `html` fragment.
    pub(crate) fn set_inner_html(&mut self, node_id: NodeId, html: &str) -> Result<()> {
        if self.element(node_id).is_none() {
            return Err(Error::MissingNode("innerHTML target is not an element".into()));
        }

        let fragment = parse_html(html)?;

        let old_children = std::mem::take(&mut self.nodes[node_id.0].children);
        for child in old_children {
            self.nodes[child.0].parent = None;
        }

        let children = fragment.nodes[fragment.root.0].children.clone();
        for child in children {
            self.clone_subtree_from_dom(&fragment, child, node_id);
        }

        self.rebuild_id_index();
        Ok(())
    }

    fn clone_subtree_from_dom(&mut self, source: &Dom, source_node: NodeId, parent: NodeId) {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            let node_type = source.nodes[source_node.0].node_type.clone();
            let node = self.create_node(Some(parent), node_type);
            for child in &source.nodes[source_node.0].children {
                self.clone_subtree_from_dom(source, *child, node);
            }
        })
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(Error::MissingNode(
                "removeChild target is not a direct child".into(),
            ));
        }
        self.nodes[parent.0].children.retain(|id| *id != child);
        self.nodes[child.0].parent = None;
        self.rebuild_id_index();
        Ok(())
    }

    pub(crate) fn style_get(&self, node_id: NodeId, name: &str) -> Result<String> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::MissingNode("style target is not an element".into()))?;
        let name = name.to_ascii_lowercase();
        let decls = parse_style_declarations(element.attr("style"));
        Ok(decls
            .iter()
            .find(|(prop, _)| prop == &name)
            .map(|(_, value)| value.clone())
            .unwrap_or_default())
    }

    /// Sets one inline declaration; an empty value removes it.
    pub(crate) fn style_set(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::MissingNode("style target is not an element".into()))?;
        let name = name.to_ascii_lowercase();

        let mut decls = parse_style_declarations(element.attr("style"));
        if let Some(pos) = decls.iter().position(|(prop, _)| prop == &name) {
            if value.is_empty() {
                decls.remove(pos);
            } else {
                decls[pos].1 = value.to_string();
            }
        } else if !value.is_empty() {
            decls.push((name, value.to_string()));
        }

        self.set_attr(node_id, "style", &serialize_style_declarations(&decls))
    }

    /// Reading a layout dimension forces a layout pass. There is no layout
    /// engine, so dimensions are always zero.
    pub(crate) fn offset_width(&mut self, node_id: NodeId) -> Result<i64> {
        if self.element(node_id).is_none() {
            return Err(Error::MissingNode(
                "offsetWidth target is not an element".into(),
            ));
        }
        self.layout_passes += 1;
        Ok(0)
    }

    pub(crate) fn layout_passes(&self) -> u64 {
        self.layout_passes
    }

    fn rebuild_id_index(&mut self) {
        let mut next = HashMap::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if let NodeType::Element(element) = &self.nodes[node.0].node_type {
                if let Some(id) = element.attr("id") {
                    if !id.is_empty() {
                        next.entry(id.to_string()).or_insert(node);
                    }
                }
            }
            for child in self.nodes[node.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        self.id_index = next;
    }

    fn dump_node(&self, node_id: NodeId, out: &mut String) {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            match &self.nodes[node_id.0].node_type {
                NodeType::Document => {
                    for child in &self.nodes[node_id.0].children {
                        self.dump_node(*child, out);
                    }
                }
                NodeType::Text(text) => out.push_str(text),
                NodeType::Element(element) => {
                    out.push('<');
                    out.push_str(&element.tag_name);
                    for (k, v) in &element.attrs {
                        out.push(' ');
                        out.push_str(k);
                        out.push_str("=\"");
                        out.push_str(&v.replace('"', "&quot;"));
                        out.push('"');
                    }
                    out.push('>');
                    if is_void_tag(&element.tag_name) {
                        return;
                    }
                    for child in &self.nodes[node_id.0].children {
                        self.dump_node(*child, out);
                    }
                    out.push_str("</");
                    out.push_str(&element.tag_name);
                    out.push('>');
                }
            }
        })
    }
}

fn parse_style_declarations(style_attr: Option<&str>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let Some(style_attr) = style_attr else {
        return out;
    };

    for decl in style_attr.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let value = value.trim().to_string();
        if let Some(pos) = out.iter().position(|(existing, _)| existing == &name) {
            out[pos].1 = value;
        } else {
            out.push((name, value));
        }
    }

    out
}

fn serialize_style_declarations(decls: &[(String, String)]) -> String {
    let mut out = String::new();
    for (idx, (name, value)) in decls.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push(';');
    }
    out
}

fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();

    let mut stack = vec![dom.root];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            if let Some(end) = find_subslice(bytes, i + 4, b"-->") {
                i = end + 3;
            } else {
                return Err(Error::HtmlParse("unclosed HTML comment".into()));
            }
            continue;
        }

        if starts_with_at(bytes, i, b"<!") {
            let end = find_subslice(bytes, i, b">")
                .ok_or_else(|| Error::HtmlParse("unclosed declaration".into()))?;
            i = end + 1;
            continue;
        }

        if opens_tag(bytes, i) {
            if starts_with_at(bytes, i, b"</") {
                let (tag, next) = parse_end_tag(html, i)?;
                i = next;

                while stack.len() > 1 {
                    let top = *stack
                        .last()
                        .ok_or_else(|| Error::HtmlParse("invalid stack state".into()))?;
                    let top_tag = dom.tag_name(top).unwrap_or("");
                    let matched = top_tag.eq_ignore_ascii_case(&tag);
                    stack.pop();
                    if matched {
                        break;
                    }
                }
                continue;
            }

            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;

            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            let node = dom.create_element(parent, tag.clone(), attrs);

            if !self_closing && is_raw_text_tag(&tag) {
                let close = find_case_insensitive_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
                if let Some(body) = html.get(i..close) {
                    if !body.is_empty() {
                        dom.create_text(node, body.to_string());
                    }
                }
                let (_, after_end) = parse_end_tag(html, close)?;
                i = after_end;
                continue;
            }

            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        // A `<` that opens no tag is literal text.
        let text_start = i;
        i += 1;
        while i < bytes.len() && !opens_tag(bytes, i) && !starts_with_at(bytes, i, b"<!") {
            i += 1;
        }

        if let Some(text) = html.get(text_start..i) {
            if !text.is_empty() {
                let parent = *stack
                    .last()
                    .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
                dom.create_text(parent, text.to_string());
            }
        }
    }

    Ok(dom)
}

fn parse_start_tag(html: &str, at: usize) -> Result<(String, Vec<(String, String)>, bool, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;
    if bytes.get(i) != Some(&b'<') {
        return Err(Error::HtmlParse("expected '<'".into()));
    }
    i += 1;

    skip_ws(bytes, &mut i);
    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid tag name".into()))?
        .to_string();

    if tag.is_empty() {
        return Err(Error::HtmlParse(format!("empty tag name at {at}")));
    }

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(Error::HtmlParse("unclosed start tag".into()));
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'>' {
            self_closing = true;
            i += 2;
            break;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }

        let name = html
            .get(name_start..i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute name".into()))?
            .to_string();

        if name.is_empty() {
            return Err(Error::HtmlParse(format!("invalid attribute name at {i}")));
        }

        skip_ws(bytes, &mut i);

        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, bytes, &mut i)?
        } else {
            String::new()
        };

        if let Some(existing) = attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            existing.1 = value;
        } else {
            attrs.push((name, value));
        }
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;

    if !(bytes.get(i) == Some(&b'<') && bytes.get(i + 1) == Some(&b'/')) {
        return Err(Error::HtmlParse("expected end tag".into()));
    }
    i += 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid end tag".into()))?
        .to_string();

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::HtmlParse("unclosed end tag".into()));
    }

    Ok((tag, i + 1))
}

fn parse_attr_value(html: &str, bytes: &[u8], i: &mut usize) -> Result<String> {
    if *i >= bytes.len() {
        return Err(Error::HtmlParse("missing attribute value".into()));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        if *i >= bytes.len() {
            return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
        }
        let value = html
            .get(start..*i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?
            .replace("&quot;", "\"");
        *i += 1;
        return Ok(value);
    }

    let start = *i;
    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !(bytes[*i] == b'/' && *i + 1 < bytes.len() && bytes[*i + 1] == b'>')
    {
        *i += 1;
    }

    let value = html
        .get(start..*i)
        .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?
        .to_string();
    Ok(value)
}

fn opens_tag(bytes: &[u8], at: usize) -> bool {
    if bytes.get(at) != Some(&b'<') {
        return false;
    }
    match bytes.get(at + 1) {
        Some(b'/') => bytes.get(at + 2).is_some_and(u8::is_ascii_alphabetic),
        Some(next) => next.is_ascii_alphabetic(),
        None => false,
    }
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'<')
}

fn is_raw_text_tag(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("style")
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    if at + needle.len() > bytes.len() {
        return false;
    }
    &bytes[at..at + needle.len()] == needle
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > bytes.len() {
        return None;
    }

    let mut i = from;
    while i + needle.len() <= bytes.len() {
        if &bytes[i..i + needle.len()] == needle {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn find_case_insensitive_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut needle = Vec::with_capacity(tag.len() + 2);
    needle.extend_from_slice(b"</");
    needle.extend(tag.iter().map(|b| b.to_ascii_lowercase()));

    let mut i = from;
    while i + needle.len() <= bytes.len() {
        let matched = bytes[i..i + needle.len()]
            .iter()
            .zip(&needle)
            .all(|(a, b)| a.to_ascii_lowercase() == *b);
        if matched {
            return Some(i);
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(dom: &Dom, id: &str) -> Result<NodeId> {
        dom.by_id(id)
            .ok_or_else(|| Error::ElementNotFound(id.to_string()))
    }

    #[test]
    fn parse_indexes_ids_and_keeps_attribute_case() -> Result<()> {
        let dom = Dom::parse(
            r#"<div id="qr_0"><svg viewBox="0 0 10 10" xmlns="http://www.w3.org/2000/svg"><path d="M0 0h1v1H0z"/></svg></div>"#,
        )?;
        let qr = node(&dom, "qr_0")?;
        let svg = dom.first_child(qr).ok_or_else(|| Error::MissingNode("svg".into()))?;
        assert_eq!(dom.tag_name(svg), Some("svg"));
        assert_eq!(
            dom.outer_html(svg),
            r#"<svg viewBox="0 0 10 10" xmlns="http://www.w3.org/2000/svg"><path d="M0 0h1v1H0z"></path></svg>"#
        );
        Ok(())
    }

    #[test]
    fn serialized_markup_reparses_to_the_same_markup() -> Result<()> {
        let dom = Dom::parse(r#"<div id="a"><svg><rect width='2' title='say "hi"'/>A</svg></div>"#)?;
        let a = node(&dom, "a")?;
        let first = dom.inner_html(a)?;

        let mut other = Dom::parse(r#"<div id="b"></div>"#)?;
        let b = node(&other, "b")?;
        other.set_inner_html(b, &first)?;
        assert_eq!(other.inner_html(b)?, first);
        Ok(())
    }

    #[test]
    fn set_inner_html_replaces_children_and_updates_id_index() -> Result<()> {
        let mut dom = Dom::parse(r#"<div id="box"><p id="old">x</p></div>"#)?;
        let target = node(&dom, "box")?;
        dom.set_inner_html(target, r#"<span id="new">y</span>"#)?;
        assert!(dom.by_id("old").is_none());
        assert_eq!(dom.text_content(node(&dom, "new")?), "y");
        Ok(())
    }

    #[test]
    fn remove_child_detaches_subtree() -> Result<()> {
        let mut dom = Dom::parse(r#"<div id="qr"><svg id="code"></svg></div>"#)?;
        let qr = node(&dom, "qr")?;
        let svg = node(&dom, "code")?;
        dom.remove_child(qr, svg)?;
        assert!(dom.children(qr).is_empty());
        assert!(dom.by_id("code").is_none());
        assert!(matches!(dom.remove_child(qr, svg), Err(Error::MissingNode(_))));
        Ok(())
    }

    #[test]
    fn inline_style_declarations_round_trip() -> Result<()> {
        let mut dom = Dom::parse(r#"<div id="t" style="animation: shrink 10s linear;"></div>"#)?;
        let t = node(&dom, "t")?;
        dom.style_set(t, "animation-play-state", "running")?;
        assert_eq!(
            dom.attr(t, "style").as_deref(),
            Some("animation: shrink 10s linear; animation-play-state: running;")
        );
        dom.style_set(t, "animation", "none")?;
        assert_eq!(dom.style_get(t, "animation")?, "none");
        dom.style_set(t, "animation", "")?;
        dom.style_set(t, "animation-play-state", "")?;
        assert_eq!(dom.attr(t, "style"), None);
        Ok(())
    }

    #[test]
    fn offset_width_counts_layout_passes() -> Result<()> {
        let mut dom = Dom::parse(r#"<div id="t"></div>"#)?;
        let t = node(&dom, "t")?;
        assert_eq!(dom.offset_width(t)?, 0);
        assert_eq!(dom.offset_width(t)?, 0);
        assert_eq!(dom.layout_passes(), 2);
        Ok(())
    }

    #[test]
    fn raw_text_and_doctype_are_not_parsed_as_markup() -> Result<()> {
        let dom = Dom::parse(
            "<!DOCTYPE html><script id=\"s\">if (a < b) { x(); }</script><br id=\"b\">",
        )?;
        assert_eq!(dom.text_content(node(&dom, "s")?), "if (a < b) { x(); }");
        assert_eq!(dom.outer_html(node(&dom, "b")?), "<br id=\"b\">");
        Ok(())
    }

    #[test]
    fn stray_less_than_is_kept_as_text() -> Result<()> {
        let dom = Dom::parse(r#"<p id="p">1 < 2 and 3 <= 4 </ x <b>bold</b> tail <</p>"#)?;
        let p = node(&dom, "p")?;
        assert_eq!(dom.text_content(p), "1 < 2 and 3 <= 4 </ x bold tail <");
        assert_eq!(
            dom.inner_html(p)?,
            "1 < 2 and 3 <= 4 </ x <b>bold</b> tail <"
        );
        Ok(())
    }

    #[test]
    fn detached_nodes_stay_in_the_arena_but_leave_the_tree() -> Result<()> {
        let mut dom = Dom::parse(r#"<div id="qr"><svg id="code"></svg></div>"#)?;
        let qr = node(&dom, "qr")?;
        let old = node(&dom, "code")?;
        let before = dom.nodes.len();

        dom.set_inner_html(qr, r#"<svg id="code"></svg>"#)?;
        assert_eq!(dom.nodes.len(), before + 1);
        assert_eq!(dom.parent(old), None);
        assert_ne!(dom.by_id("code"), Some(old));
        assert_eq!(dom.inner_html(qr)?, r#"<svg id="code"></svg>"#);
        Ok(())
    }

    #[test]
    fn unclosed_comment_is_a_parse_error() {
        assert!(matches!(
            Dom::parse("<div><!-- oops</div>"),
            Err(Error::HtmlParse(_))
        ));
    }
}
