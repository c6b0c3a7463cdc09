/// Brace-delimited bodies of `func`, `repeat` and `if`

/// Lines belonging to a compound statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// Body lines, untrimmed, without the header and closing brace
    pub body: Vec<String>,
    /// Lines consumed from the input, header and closing brace included
    pub consumed: usize,
}

/// Extract the block opened by `lines[0]`.
///
/// Depth starts at 1 after the header and moves by every `{` and `}` on each
/// following line, quoted or not. The line that brings depth to zero is
/// consumed but not kept. A header whose own braces balance, such as
/// `repeat 3 { say "hi" }`, is a one-line block holding the text between
/// its outermost braces. Running out of lines ends the block.
pub fn extract_block<S: AsRef<str>>(lines: &[S]) -> Block {
    let header = match lines.first() {
        Some(header) => header.as_ref(),
        None => return Block::default(),
    };

    if let Some(inline) = inline_body(header) {
        let body = if inline.is_empty() {
            Vec::new()
        } else {
            vec![inline.to_string()]
        };
        return Block { body, consumed: 1 };
    }

    let mut body = Vec::new();
    let mut depth: i64 = 1;
    let mut consumed = 1;

    while consumed < lines.len() && depth > 0 {
        let line = lines[consumed].as_ref();
        depth += line.matches('{').count() as i64;
        depth -= line.matches('}').count() as i64;

        if depth > 0 {
            body.push(line.to_string());
        }
        consumed += 1;
    }

    Block { body, consumed }
}

fn inline_body(header: &str) -> Option<&str> {
    let opens = header.matches('{').count();
    if opens == 0 || opens != header.matches('}').count() {
        return None;
    }

    let start = header.find('{')?;
    let end = header.rfind('}')?;
    if end < start {
        return None;
    }
    Some(header[start + 1..end].trim())
}
