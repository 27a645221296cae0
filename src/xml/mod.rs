//! Minimal XML element reader backing `parse-as-xml`.
//!
//! Converts a well-formed XML element tree into a JSON object the same
//! shape the JSON-aware steps produce: the root element name maps to an
//! object carrying attributes as keys, child elements grouped by name
//! (repeated names become arrays), and text-only elements as strings.
//! Mixed content keeps its text under a `content` key.
//!
//! Namespaces, DTDs and processing instructions beyond the `<?xml?>`
//! prolog are out of scope; comments are skipped.

use serde_json::{Map, Value as Json};

/// Parse an XML document fragment into a one-key JSON object
/// (`{ root-name: … }`).
pub fn xml_to_json(input: &str) -> Result<Map<String, Json>, String> {
    let mut cursor = Cursor::new(input.trim_start_matches('\u{feff}'));
    cursor.skip_misc()?;
    let (name, value) = cursor.parse_element()?;
    cursor.skip_misc()?;
    if !cursor.at_end() {
        return Err(format!(
            "unexpected trailing content at offset {}",
            cursor.pos
        ));
    }
    let mut root = Map::new();
    root.insert(name, value);
    Ok(root)
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, prefix: &str) -> Result<(), String> {
        if self.eat(prefix) {
            Ok(())
        } else {
            Err(format!("expected '{}' at offset {}", prefix, self.pos))
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Whitespace, the `<?xml?>` prolog and comments between elements.
    fn skip_misc(&mut self) -> Result<(), String> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("<?") {
                match self.rest().find("?>") {
                    Some(end) => self.pos += end + 2,
                    None => return Err("unterminated processing instruction".to_string()),
                }
            } else if self.rest().starts_with("<!--") {
                match self.rest().find("-->") {
                    Some(end) => self.pos += end + 3,
                    None => return Err("unterminated comment".to_string()),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn parse_name(&mut self) -> Result<String, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')) {
            self.bump();
        }
        if self.pos == start {
            return Err(format!("expected a name at offset {}", start));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// `<name attr="v"…>children</name>` or `<name…/>`.
    fn parse_element(&mut self) -> Result<(String, Json), String> {
        self.expect("<")?;
        let name = self.parse_name()?;
        let mut object = Map::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('/') => {
                    self.expect("/>")?;
                    return Ok((name, finish_element(object, String::new())));
                }
                Some('>') => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    let attr = self.parse_name()?;
                    self.skip_whitespace();
                    self.expect("=")?;
                    self.skip_whitespace();
                    let value = self.parse_attr_value()?;
                    insert_grouped(&mut object, attr, Json::String(value));
                }
                None => return Err("unterminated element".to_string()),
            }
        }

        let mut text = String::new();
        loop {
            if self.rest().starts_with("</") {
                self.expect("</")?;
                let closing = self.parse_name()?;
                if closing != name {
                    return Err(format!(
                        "mismatched closing tag '</{}>' for '<{}>'",
                        closing, name
                    ));
                }
                self.skip_whitespace();
                self.expect(">")?;
                return Ok((name, finish_element(object, text)));
            } else if self.rest().starts_with("<!--") {
                self.skip_misc()?;
            } else if self.rest().starts_with('<') {
                let (child_name, child) = self.parse_element()?;
                insert_grouped(&mut object, child_name, child);
            } else {
                match self.bump() {
                    Some('&') => text.push(self.parse_entity()?),
                    Some(c) => text.push(c),
                    None => return Err(format!("missing closing tag for '<{}>'", name)),
                }
            }
        }
    }

    fn parse_attr_value(&mut self) -> Result<String, String> {
        let quote = match self.bump() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(format!("expected a quoted value at offset {}", self.pos)),
        };
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(value),
                Some('&') => value.push(self.parse_entity()?),
                Some(c) => value.push(c),
                None => return Err("unterminated attribute value".to_string()),
            }
        }
    }

    /// Called after the `&`; decodes the five named entities plus
    /// numeric references.
    fn parse_entity(&mut self) -> Result<char, String> {
        let end = self
            .rest()
            .find(';')
            .ok_or_else(|| "unterminated entity".to_string())?;
        let entity = &self.rest()[..end];
        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| format!("unknown entity '&{};'", entity))?
            }
        };
        self.pos += end + 1;
        Ok(decoded)
    }
}

/// Text-only elements collapse to a string; mixed content keeps its text
/// under `content`.
fn finish_element(mut object: Map<String, Json>, text: String) -> Json {
    let text = text.trim();
    if object.is_empty() {
        return Json::String(text.to_string());
    }
    if !text.is_empty() {
        object.insert("content".to_string(), Json::String(text.to_string()));
    }
    Json::Object(object)
}

/// First occurrence inserts plainly; repeats regroup into an array.
fn insert_grouped(object: &mut Map<String, Json>, key: String, value: Json) {
    match object.get_mut(&key) {
        None => {
            object.insert(key, value);
        }
        Some(Json::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Json::Array(vec![first, value]);
        }
    }
}
