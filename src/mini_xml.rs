//! Minimal XML parser used for script parameter manifests.
//!
//! This parser supports elements, attributes, text, CDATA sections, comments,
//! processing instructions, predefined and numeric character references, and
//! namespace declarations. A `<!DOCTYPE ...>` is skipped without entity
//! expansion. It checks well-formedness strictly enough that fragments without
//! a single root element are rejected.

use thiserror::Error;

const MAX_ELEMENT_DEPTH: usize = 256;
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
/// Well-formedness failure with a 1-based source location.
pub struct XmlParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A parsed document with its single root element.
pub struct Document {
    pub root: Element,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An element with its resolved namespace and local name.
pub struct Element {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A non-`xmlns` attribute. Unprefixed attributes carry no namespace.
pub struct Attribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Document {
    /// Returns every element in document order, root included.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        collect_elements(&self.root, &mut out);
        out
    }
}

impl Element {
    /// Whether this element has the given namespace and local name.
    pub fn is(&self, namespace: Option<&str>, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == namespace
    }

    /// Value of an unqualified attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.namespace.is_none() && attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// First direct child element with the given namespace and local name.
    pub fn child(&self, namespace: Option<&str>, name: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.is(namespace, name))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text content of this element and all its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_elements<'a>(element: &'a Element, out: &mut Vec<&'a Element>) {
    out.push(element);
    for child in element.child_elements() {
        collect_elements(child, out);
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) => collect_text(child, out),
        }
    }
}

/// Parses a complete XML document.
///
/// Line endings are normalized to `\n` before parsing.
pub fn parse_document(input: &str) -> Result<Document, XmlParseError> {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    let mut parser = Parser {
        input: &normalized,
        pos: 0,
        scopes: Vec::new(),
    };
    parser.parse_document()
}

type NamespaceScope = Vec<(Option<String>, String)>;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    scopes: Vec<NamespaceScope>,
}

impl<'a> Parser<'a> {
    fn parse_document(&mut self) -> Result<Document, XmlParseError> {
        if self.rest().starts_with('\u{feff}') {
            self.bump('\u{feff}'.len_utf8());
        }
        let declaration_pos = self.pos;

        let mut seen_doctype = false;
        loop {
            self.skip_whitespace();
            if self.starts_with("<!--") {
                self.parse_comment()?;
            } else if self.starts_with("<?") {
                let start = self.pos;
                let target = self.parse_processing_instruction()?;
                if target.eq_ignore_ascii_case("xml") && start != declaration_pos {
                    return Err(self.error_at(
                        start,
                        "XML declaration is only allowed at the start of the document",
                    ));
                }
            } else if self.starts_with("<!DOCTYPE") {
                if seen_doctype {
                    return Err(self.error("duplicate DOCTYPE declaration"));
                }
                seen_doctype = true;
                self.parse_doctype()?;
            } else {
                break;
            }
        }

        if self.rest().is_empty() {
            return Err(self.error("document has no root element"));
        }
        if !self.starts_with("<") {
            return Err(self.error("unexpected text before root element"));
        }

        let root = self.parse_element(0)?;

        loop {
            self.skip_whitespace();
            if self.starts_with("<!--") {
                self.parse_comment()?;
            } else if self.starts_with("<?") {
                let start = self.pos;
                let target = self.parse_processing_instruction()?;
                if target.eq_ignore_ascii_case("xml") {
                    return Err(self.error_at(
                        start,
                        "XML declaration is only allowed at the start of the document",
                    ));
                }
            } else {
                break;
            }
        }

        if !self.rest().is_empty() {
            return Err(self.error("unexpected content after root element"));
        }

        Ok(Document { root })
    }

    fn parse_element(&mut self, depth: usize) -> Result<Element, XmlParseError> {
        if depth >= MAX_ELEMENT_DEPTH {
            return Err(self.error(&format!(
                "maximum element nesting depth exceeded ({MAX_ELEMENT_DEPTH})"
            )));
        }

        self.expect("<")?;
        let qname = self.parse_name()?;

        let mut raw_attributes: Vec<(&'a str, String)> = Vec::new();
        let self_closing = loop {
            let had_whitespace = self.skip_whitespace();
            if self.starts_with("/>") {
                self.bump(2);
                break true;
            }
            if self.starts_with(">") {
                self.bump(1);
                break false;
            }
            if self.rest().is_empty() {
                return Err(self.error(&format!("unterminated start tag <{qname}>")));
            }
            if !had_whitespace {
                return Err(self.error("expected whitespace before attribute"));
            }

            let attr_pos = self.pos;
            let name = self.parse_name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let value = self.parse_attribute_value()?;
            if raw_attributes.iter().any(|(existing, _)| *existing == name) {
                return Err(self.error_at(attr_pos, &format!("duplicate attribute '{name}'")));
            }
            raw_attributes.push((name, value));
        };

        let mut scope = NamespaceScope::new();
        for (name, value) in &raw_attributes {
            if *name == "xmlns" {
                scope.push((None, value.clone()));
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                if value.is_empty() {
                    return Err(self.error(&format!(
                        "namespace prefix '{prefix}' cannot be bound to an empty URI"
                    )));
                }
                scope.push((Some(prefix.to_string()), value.clone()));
            }
        }

        self.scopes.push(scope);
        let element = self.finish_element(qname, raw_attributes, self_closing, depth);
        self.scopes.pop();
        element
    }

    fn finish_element(
        &mut self,
        qname: &'a str,
        raw_attributes: Vec<(&'a str, String)>,
        self_closing: bool,
        depth: usize,
    ) -> Result<Element, XmlParseError> {
        let (prefix, local) = self.split_qname(qname)?;
        let namespace = self.resolve_namespace(prefix)?;

        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (name, value) in raw_attributes {
            if name == "xmlns" || name.starts_with("xmlns:") {
                continue;
            }
            let (attr_prefix, attr_local) = self.split_qname(name)?;
            let attr_namespace = match attr_prefix {
                Some(_) => self.resolve_namespace(attr_prefix)?,
                None => None,
            };
            attributes.push(Attribute {
                name: attr_local.to_string(),
                namespace: attr_namespace,
                value,
            });
        }

        let children = if self_closing {
            Vec::new()
        } else {
            let children = self.parse_content(depth)?;
            self.parse_end_tag(qname)?;
            children
        };

        Ok(Element {
            name: local.to_string(),
            namespace,
            attributes,
            children,
        })
    }

    fn parse_content(&mut self, depth: usize) -> Result<Vec<Node>, XmlParseError> {
        let mut children = Vec::new();
        let mut text = String::new();

        loop {
            if self.rest().is_empty() {
                return Err(self.error("unexpected end of input inside element"));
            }

            if self.starts_with("</") {
                break;
            } else if self.starts_with("<!--") {
                self.parse_comment()?;
            } else if self.starts_with("<![CDATA[") {
                self.bump("<![CDATA[".len());
                let rest = self.rest();
                let end = rest
                    .find("]]>")
                    .ok_or_else(|| self.error("unterminated CDATA section"))?;
                text.push_str(&rest[..end]);
                self.bump(end + 3);
            } else if self.starts_with("<?") {
                let start = self.pos;
                let target = self.parse_processing_instruction()?;
                if target.eq_ignore_ascii_case("xml") {
                    return Err(self.error_at(
                        start,
                        "XML declaration is only allowed at the start of the document",
                    ));
                }
            } else if self.starts_with("<!") {
                return Err(self.error("unexpected markup declaration inside element"));
            } else if self.starts_with("<") {
                flush_text(&mut text, &mut children);
                children.push(Node::Element(self.parse_element(depth + 1)?));
            } else if self.starts_with("&") {
                text.push(self.parse_reference()?);
            } else if self.starts_with("]]>") {
                return Err(self.error("']]>' is not allowed in text content"));
            } else if let Some(ch) = self.peek() {
                text.push(ch);
                self.bump(ch.len_utf8());
            }
        }

        flush_text(&mut text, &mut children);
        Ok(children)
    }

    fn parse_end_tag(&mut self, qname: &str) -> Result<(), XmlParseError> {
        let start = self.pos;
        self.expect("</")?;
        let name = self.parse_name()?;
        if name != qname {
            return Err(self.error_at(
                start,
                &format!("mismatched end tag: expected </{qname}>, found </{name}>"),
            ));
        }
        self.skip_whitespace();
        self.expect(">")
    }

    fn parse_attribute_value(&mut self) -> Result<String, XmlParseError> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected quoted attribute value")),
        };
        self.bump(1);

        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated attribute value")),
                Some(ch) if ch == quote => {
                    self.bump(1);
                    return Ok(value);
                }
                Some('<') => return Err(self.error("'<' is not allowed in attribute values")),
                Some('&') => value.push(self.parse_reference()?),
                Some(ch) => {
                    value.push(if matches!(ch, '\t' | '\n') { ' ' } else { ch });
                    self.bump(ch.len_utf8());
                }
            }
        }
    }

    fn parse_reference(&mut self) -> Result<char, XmlParseError> {
        let start = self.pos;
        self.expect("&")?;
        let rest = self.rest();
        let end = rest
            .find(';')
            .ok_or_else(|| self.error_at(start, "unterminated entity reference"))?;
        let name = &rest[..end];

        let ch = match name {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => {
                let code = if let Some(hex) = name.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(decimal) = name.strip_prefix('#') {
                    decimal.parse::<u32>().ok()
                } else {
                    return Err(self.error_at(start, &format!("unknown entity '&{name};'")));
                };
                code.and_then(char::from_u32)
            }
        };

        let ch = ch.ok_or_else(|| {
            self.error_at(start, &format!("invalid character reference '&{name};'"))
        })?;
        self.bump(end + 1);
        Ok(ch)
    }

    fn parse_comment(&mut self) -> Result<(), XmlParseError> {
        let start = self.pos;
        self.bump(4);
        let rest = self.rest();
        let end = rest
            .find("--")
            .ok_or_else(|| self.error_at(start, "unterminated comment"))?;
        if !rest[end..].starts_with("-->") {
            return Err(self.error_at(start, "'--' is not permitted inside a comment"));
        }
        self.bump(end + 3);
        Ok(())
    }

    fn parse_processing_instruction(&mut self) -> Result<&'a str, XmlParseError> {
        let start = self.pos;
        self.bump(2);
        let target = self.parse_name()?;
        let rest = self.rest();
        let end = rest
            .find("?>")
            .ok_or_else(|| self.error_at(start, "unterminated processing instruction"))?;
        self.bump(end + 2);
        Ok(target)
    }

    fn parse_doctype(&mut self) -> Result<(), XmlParseError> {
        let start = self.pos;
        self.bump("<!DOCTYPE".len());

        let mut bracket_depth = 0usize;
        let mut quote: Option<char> = None;
        while let Some(ch) = self.peek() {
            self.bump(ch.len_utf8());
            match (quote, ch) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(ch),
                (None, '[') => bracket_depth += 1,
                (None, ']') => bracket_depth = bracket_depth.saturating_sub(1),
                (None, '>') if bracket_depth == 0 => return Ok(()),
                _ => {}
            }
        }

        Err(self.error_at(start, "unterminated DOCTYPE declaration"))
    }

    fn parse_name(&mut self) -> Result<&'a str, XmlParseError> {
        let rest = self.rest();
        match rest.chars().next() {
            Some(c) if is_name_start(c) => {}
            _ => return Err(self.error("expected a name")),
        }
        let end = rest
            .char_indices()
            .find(|(_, c)| !is_name_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.bump(end);
        Ok(&rest[..end])
    }

    fn split_qname(&self, qname: &'a str) -> Result<(Option<&'a str>, &'a str), XmlParseError> {
        match qname.split_once(':') {
            None => Ok((None, qname)),
            Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() && !local.contains(':') => {
                Ok((Some(prefix), local))
            }
            Some(_) => Err(self.error(&format!("invalid qualified name '{qname}'"))),
        }
    }

    fn resolve_namespace(&self, prefix: Option<&str>) -> Result<Option<String>, XmlParseError> {
        if prefix == Some("xml") {
            return Ok(Some(XML_NAMESPACE.to_string()));
        }

        let bound = self
            .scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(bound_prefix, _)| bound_prefix.as_deref() == prefix)
            .map(|(_, uri)| uri);

        match (prefix, bound) {
            (Some(p), None) => Err(self.error(&format!("unbound namespace prefix '{p}'"))),
            (_, Some(uri)) if uri.is_empty() => Ok(None),
            (_, uri) => Ok(uri.cloned()),
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), XmlParseError> {
        if self.starts_with(token) {
            self.bump(token.len());
            Ok(())
        } else {
            Err(self.error(&format!("expected '{token}'")))
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let skipped = self
            .rest()
            .bytes()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
            .count();
        self.bump(skipped);
        skipped > 0
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn starts_with(&self, token: &str) -> bool {
        self.rest().starts_with(token)
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self, len: usize) {
        self.pos += len;
    }

    fn error(&self, message: &str) -> XmlParseError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: &str) -> XmlParseError {
        let consumed = &self.input[..pos];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rsplit('\n')
            .next()
            .map(|last| last.chars().count())
            .unwrap_or(0)
            + 1;
        XmlParseError {
            message: message.to_string(),
            line,
            column,
        }
    }
}

fn flush_text(text: &mut String, children: &mut Vec<Node>) {
    if !text.is_empty() {
        children.push(Node::Text(std::mem::take(text)));
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_numeric() || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::{parse_document, Node};

    #[test]
    fn parses_nested_elements_with_default_namespace() {
        let input = r#"<?xml version="1.0" encoding="utf-8"?>
<DMSScript xmlns="http://www.skyline.be/automation">
  <Params>
    <ScriptParameter id="1" type="string"><Description>Name</Description></ScriptParameter>
  </Params>
</DMSScript>"#;

        let doc = parse_document(input).unwrap();
        let ns = Some("http://www.skyline.be/automation");
        assert!(doc.root.is(ns, "DMSScript"));

        let param = doc
            .descendants()
            .into_iter()
            .find(|el| el.is(ns, "ScriptParameter"))
            .unwrap();
        assert_eq!(param.attribute("id"), Some("1"));
        assert_eq!(param.attribute("type"), Some("string"));
        assert_eq!(param.child(ns, "Description").unwrap().text(), "Name");
    }

    #[test]
    fn resolves_prefixed_namespaces_and_scoping() {
        let input = r#"<a:Root xmlns:a="urn:a"><a:Child xmlns="urn:b"><Inner/></a:Child><Plain/></a:Root>"#;
        let doc = parse_document(input).unwrap();
        let names: Vec<_> = doc
            .descendants()
            .iter()
            .map(|el| (el.name.clone(), el.namespace.clone()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Root".to_string(), Some("urn:a".to_string())),
                ("Child".to_string(), Some("urn:a".to_string())),
                ("Inner".to_string(), Some("urn:b".to_string())),
                ("Plain".to_string(), None),
            ]
        );
    }

    #[test]
    fn default_namespace_can_be_undeclared() {
        let doc = parse_document(r#"<Root xmlns="urn:a"><Child xmlns=""/></Root>"#).unwrap();
        let child = doc.root.child_elements().next().unwrap();
        assert_eq!(child.namespace, None);
    }

    #[test]
    fn decodes_entities_cdata_and_skips_comments() {
        let input = "<Root>a &lt;b&gt; &amp; &#65;&#x42;<!-- note --><![CDATA[<raw>]]></Root>";
        let doc = parse_document(input).unwrap();
        assert_eq!(doc.root.text(), "a <b> & AB<raw>");
    }

    #[test]
    fn decodes_attribute_references_and_quotes() {
        let doc = parse_document(r#"<Root a='say "hi"' b="x &quot;y&quot;"/>"#).unwrap();
        assert_eq!(doc.root.attribute("a"), Some(r#"say "hi""#));
        assert_eq!(doc.root.attribute("b"), Some(r#"x "y""#));
    }

    #[test]
    fn keeps_text_nodes_between_elements() {
        let doc = parse_document("<Root>one<Child>two</Child>three</Root>").unwrap();
        assert_eq!(doc.root.children.len(), 3);
        assert!(matches!(&doc.root.children[0], Node::Text(t) if t == "one"));
        assert_eq!(doc.root.text(), "onetwothree");
    }

    #[test]
    fn skips_doctype_before_root() {
        let input = "<!DOCTYPE Root [ <!ELEMENT Root ANY> ]>\n<Root/>";
        assert!(parse_document(input).is_ok());
    }

    #[test]
    fn rejects_multiple_root_elements() {
        let err = parse_document("<A/><B/>").unwrap_err();
        assert!(err.message.contains("unexpected content after root element"));
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn rejects_text_before_root_and_empty_documents() {
        let err = parse_document("hello <A/>").unwrap_err();
        assert!(err.message.contains("unexpected text before root element"));

        let err = parse_document("  <!-- only a comment -->  ").unwrap_err();
        assert!(err.message.contains("document has no root element"));
    }

    #[test]
    fn rejects_mismatched_end_tag_with_location() {
        let err = parse_document("<Root>\n  <A></B>\n</Root>").unwrap_err();
        assert!(err
            .message
            .contains("mismatched end tag: expected </A>, found </B>"));
        assert_eq!((err.line, err.column), (2, 6));
        assert!(err.to_string().ends_with("at line 2, column 6"));
    }

    #[test]
    fn rejects_unbound_prefix_and_duplicate_attributes() {
        let err = parse_document("<p:Root/>").unwrap_err();
        assert!(err.message.contains("unbound namespace prefix 'p'"));

        let err = parse_document(r#"<Root a="1" a="2"/>"#).unwrap_err();
        assert!(err.message.contains("duplicate attribute 'a'"));
    }

    #[test]
    fn rejects_unknown_entities_and_unterminated_input() {
        let err = parse_document("<Root>&nbsp;</Root>").unwrap_err();
        assert!(err.message.contains("unknown entity '&nbsp;'"));

        let err = parse_document("<Root><Child>").unwrap_err();
        assert!(err.message.contains("unexpected end of input inside element"));
    }

    #[test]
    fn rejects_xml_declaration_after_start() {
        let err = parse_document("<Wrap><?xml version=\"1.0\"?><A/></Wrap>").unwrap_err();
        assert!(err
            .message
            .contains("XML declaration is only allowed at the start of the document"));
    }

    #[test]
    fn rejects_excessive_nesting_depth() {
        let mut input = String::new();
        for _ in 0..300 {
            input.push_str("<a>");
        }
        for _ in 0..300 {
            input.push_str("</a>");
        }
        let err = parse_document(&input).unwrap_err();
        assert!(err.message.contains("maximum element nesting depth exceeded"));
    }
}
