//! Minimal parser for Valve's KeyValues text format (`*.vdf`).
//!
//! Only the subset Steam uses in `libraryfolders.vdf` is supported: quoted
//! (or bare) string tokens, nested `{}` blocks, `\\`/`\"` escapes and `//`
//! line comments. Document order is preserved so lookups stay deterministic.

#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Block(Block),
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub entries: Vec<(String, Value)>,
}

impl Block {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Value::String(s) => Some(s.as_str()),
            Value::Block(_) => None,
        }
    }

    pub fn get_block(&self, key: &str) -> Option<&Block> {
        match self.get(key)? {
            Value::Block(b) => Some(b),
            Value::String(_) => None,
        }
    }

    /// Sub-blocks whose key is all digits, in document order.
    ///
    /// Steam numbers its library-folder sections "0", "1", ... and we rely on
    /// the file's own ordering rather than re-sorting.
    pub fn numeric_blocks(&self) -> impl Iterator<Item = (&str, &Block)> {
        self.entries.iter().filter_map(|(k, v)| {
            if k.is_empty() || !k.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            match v {
                Value::Block(b) => Some((k.as_str(), b)),
                Value::String(_) => None,
            }
        })
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Str(String),
    Open,
    Close,
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = vec![];
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        match c {
            '{' => tokens.push(Token::Open),
            '}' => tokens.push(Token::Close),
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '"' => {
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(e) => s.push(e),
                            None => return Err("unterminated escape in quoted token".to_string()),
                        },
                        Some(c) => s.push(c),
                        None => return Err("unterminated quoted token".to_string()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            _ => {
                // Bare token: runs until whitespace or a structural character.
                let mut s = String::new();
                s.push(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || next == '{' || next == '}' || next == '"' {
                        break;
                    }
                    s.push(next);
                    chars.next();
                }
                tokens.push(Token::Str(s));
            }
        }
    }

    Ok(tokens)
}

/// Parse a whole document into its implicit top-level block.
pub fn parse(text: &str) -> Result<Block, String> {
    let tokens = tokenize(text)?;
    let mut pos = 0usize;
    parse_block(&tokens, &mut pos, true)
}

fn parse_block(tokens: &[Token], pos: &mut usize, top_level: bool) -> Result<Block, String> {
    let mut block = Block::default();

    loop {
        match tokens.get(*pos) {
            None => {
                if top_level {
                    return Ok(block);
                }
                return Err("unexpected end of input inside block".to_string());
            }
            Some(Token::Close) => {
                if top_level {
                    return Err("unmatched closing brace".to_string());
                }
                *pos += 1;
                return Ok(block);
            }
            Some(Token::Open) => return Err("block has no key".to_string()),
            Some(Token::Str(key)) => {
                let key = key.clone();
                *pos += 1;
                match tokens.get(*pos) {
                    Some(Token::Str(value)) => {
                        block.entries.push((key, Value::String(value.clone())));
                        *pos += 1;
                    }
                    Some(Token::Open) => {
                        *pos += 1;
                        let child = parse_block(tokens, pos, false)?;
                        block.entries.push((key, Value::Block(child)));
                    }
                    Some(Token::Close) | None => {
                        return Err(format!("key {key:?} has no value"));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY_FOLDERS: &str = r#"
"libraryfolders"
{
	"0"
	{
		"path"		"C:\\Program Files (x86)\\Steam"
		"label"		""
		"contentid"		"8434445423659655713"
	}
	"1"
	{
		"path"		"D:\\SteamLibrary"
		"apps"
		{
			"211420"		"6103576936"
		}
	}
}
"#;

    #[test]
    fn parses_library_folders_document() {
        let doc = parse(LIBRARY_FOLDERS).unwrap();
        let folders = doc.get_block("libraryfolders").unwrap();

        let paths: Vec<&str> = folders
            .numeric_blocks()
            .filter_map(|(_, b)| b.get_str("path"))
            .collect();
        assert_eq!(
            paths,
            vec![r"C:\Program Files (x86)\Steam", r"D:\SteamLibrary"]
        );
    }

    #[test]
    fn numeric_blocks_skip_non_numeric_keys() {
        let doc = parse(r#""root" { "0" { } "contentstatsid" "123" "2" { } }"#).unwrap();
        let root = doc.get_block("root").unwrap();
        let keys: Vec<&str> = root.numeric_blocks().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["0", "2"]);
    }

    #[test]
    fn ignores_line_comments() {
        let doc = parse("// header\n\"k\" \"v\" // trailing\n").unwrap();
        assert_eq!(doc.get_str("k"), Some("v"));
    }

    #[test]
    fn unescapes_quotes_and_backslashes() {
        let doc = parse(r#""k" "a \"quoted\" path\\end""#).unwrap();
        assert_eq!(doc.get_str("k"), Some(r#"a "quoted" path\end"#));
    }

    #[test]
    fn rejects_truncated_block() {
        assert!(parse(r#""root" { "k" "v""#).is_err());
    }

    #[test]
    fn rejects_key_without_value() {
        assert!(parse(r#""root" { "dangling" }"#).is_err());
    }
}
