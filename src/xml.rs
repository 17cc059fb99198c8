//! Hand-written XML tokenizer and tree builder
//!
//! A deliberately small parser covering the subset the upload pipeline
//! needs: the `<?xml ?>` declaration, comments, nested elements with
//! double-quoted attributes, self-closing tags and character data. Entity
//! references are passed through verbatim. Not a validating parser.

use crate::error::AppError;

/// One `key="value"` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub key: String,
    pub value: String,
}

/// One element node
#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    /// Element tag name
    pub tag: String,
    /// Concatenated character data directly inside this element
    pub inner_text: Option<String>,
    /// Attributes in document order
    pub attributes: Vec<XmlAttribute>,
    /// Child elements in document order
    pub children: Vec<XmlNode>,
}

/// A parsed document
///
/// `root` is a synthetic container whose children are the document's
/// top-level elements.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub version: Option<String>,
    pub encoding: Option<String>,
    pub root: XmlNode,
}

impl XmlDocument {
    /// Parse a document from its full text
    pub fn parse(input: &str) -> Result<Self, AppError> {
        Parser::new(input).parse_document()
    }
}

struct Parser<'a> {
    chars: std::str::Chars<'a>,
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars(),
            rest: input,
        }
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest.starts_with(prefix)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        self.rest = self.chars.as_str();
        c
    }

    fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    /// Consume up to and including `needle`; error on EOF
    fn skip_past(&mut self, needle: &str) -> Result<(), AppError> {
        match self.rest.find(needle) {
            Some(pos) => {
                self.skip(self.rest[..pos].chars().count() + needle.chars().count());
                Ok(())
            }
            None => Err(AppError::Xml(format!("unterminated construct, expected '{}'", needle))),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn parse_document(mut self) -> Result<XmlDocument, AppError> {
        let mut doc = XmlDocument {
            version: None,
            encoding: None,
            root: XmlNode::default(),
        };

        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                break;
            }
            if self.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if self.starts_with("<?") {
                self.parse_declaration(&mut doc)?;
            } else if self.starts_with("<") {
                let node = self.parse_element()?;
                doc.root.children.push(node);
            } else {
                // Stray character data outside any element
                self.bump();
            }
        }

        if doc.root.children.is_empty() {
            return Err(AppError::Xml("document has no root element".to_string()));
        }
        Ok(doc)
    }

    fn parse_declaration(&mut self, doc: &mut XmlDocument) -> Result<(), AppError> {
        self.skip(2); // "<?"
        let _name = self.take_while(|c| !c.is_whitespace() && c != '?');
        loop {
            self.skip_whitespace();
            if self.starts_with("?>") {
                self.skip(2);
                return Ok(());
            }
            if self.peek().is_none() {
                return Err(AppError::Xml("unterminated XML declaration".to_string()));
            }
            let (key, value) = self.parse_attribute()?;
            match key.as_str() {
                "version" => doc.version = Some(value),
                "encoding" => doc.encoding = Some(value),
                _ => {}
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<(String, String), AppError> {
        let key = self.take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/');
        self.skip_whitespace();
        if self.peek() != Some('=') {
            return Err(AppError::Xml(format!("attribute '{}' has no value", key)));
        }
        self.bump();
        self.skip_whitespace();
        if self.peek() != Some('"') {
            return Err(AppError::Xml(format!("attribute '{}' value is not quoted", key)));
        }
        self.bump();
        let value = self.take_while(|c| c != '"');
        if self.bump() != Some('"') {
            return Err(AppError::Xml(format!("attribute '{}' value is unterminated", key)));
        }
        Ok((key, value))
    }

    fn parse_element(&mut self) -> Result<XmlNode, AppError> {
        self.bump(); // '<'
        let tag = self.take_while(|c| !c.is_whitespace() && c != '>' && c != '/');
        if tag.is_empty() {
            return Err(AppError::Xml("empty element tag".to_string()));
        }

        let mut node = XmlNode {
            tag,
            ..XmlNode::default()
        };

        // Attributes up to '>' or '/>'
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('>') => {
                    self.bump();
                    break;
                }
                Some('/') => {
                    self.bump();
                    if self.bump() != Some('>') {
                        return Err(AppError::Xml(format!("malformed tag <{}>", node.tag)));
                    }
                    return Ok(node); // self-closing
                }
                Some(_) => {
                    let (key, value) = self.parse_attribute()?;
                    node.attributes.push(XmlAttribute { key, value });
                }
                None => {
                    return Err(AppError::Xml(format!("unterminated tag <{}>", node.tag)));
                }
            }
        }

        // Content until the matching close tag
        let mut text = String::new();
        loop {
            if self.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if self.starts_with("</") {
                self.skip(2);
                let close = self.take_while(|c| !c.is_whitespace() && c != '>');
                self.skip_whitespace();
                if self.bump() != Some('>') {
                    return Err(AppError::Xml(format!("unterminated close tag </{}>", close)));
                }
                if close != node.tag {
                    return Err(AppError::Xml(format!(
                        "mismatched close tag: expected </{}>, found </{}>",
                        node.tag, close
                    )));
                }
                break;
            } else if self.starts_with("<") {
                let child = self.parse_element()?;
                node.children.push(child);
            } else if self.peek().is_some() {
                text.push_str(&self.take_while(|c| c != '<'));
            } else {
                return Err(AppError::Xml(format!("element <{}> is never closed", node.tag)));
            }
        }

        if !text.is_empty() {
            node.inner_text = Some(text);
        }
        Ok(node)
    }
}
