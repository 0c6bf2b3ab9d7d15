//! Recursive-descent parser (spec C6). Operates directly on the
//! indentation-resolved line list from [`lexer::indent_structure`] rather
//! than re-walking the token stream: expressions and command arguments are
//! kept as source-text slices (see `ast` module docs), so the parser's
//! real job is recognizing statement shapes and block boundaries.

use crate::error::ParseError;
use crate::script::ast::{CodeBlock, IfBranch, Statement};
use crate::script::lexer::{indent_structure, LogicalLine};

/// Default bound used when a `parallel` block doesn't pin one down via
/// surrounding context; the executor may override it from shell state.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

pub struct Parser {
    lines: Vec<LogicalLine>,
    pos: usize,
    pub warnings: Vec<String>,
}

pub fn parse_script(source: &str) -> Result<CodeBlock, ParseError> {
    let lines = indent_structure(source)?;
    let mut parser = Parser { lines, pos: 0, warnings: Vec::new() };
    parser.parse_block(0)
}

/// `parse_line` convenience: parse the text; if the resulting `CodeBlock`
/// has exactly one child, return that child; otherwise return the block.
pub fn parse_line(single_line: &str) -> Result<Statement, ParseError> {
    let block = parse_script(single_line)?;
    if block.statements.len() == 1 {
        Ok(block.statements.into_iter().next().unwrap())
    } else {
        Ok(Statement::Block(block))
    }
}

impl Parser {
    fn peek(&self) -> Option<&LogicalLine> {
        self.lines.get(self.pos)
    }

    fn at_depth(&self, depth: usize) -> bool {
        self.peek().map(|l| l.depth == depth).unwrap_or(false)
    }

    fn advance(&mut self) -> LogicalLine {
        let line = self.lines[self.pos].clone();
        self.pos += 1;
        line
    }

    fn parse_block(&mut self, depth: usize) -> Result<CodeBlock, ParseError> {
        let mut statements = Vec::new();
        while self.at_depth(depth) {
            let before = self.pos;
            statements.push(self.parse_statement(depth)?);
            if self.pos == before {
                // Guard against a statement parser that makes no progress:
                // skip the line and keep going instead of looping forever.
                self.warnings.push(format!("line {}: no progress parsing statement, skipping", self.lines[self.pos].line_no));
                self.pos += 1;
            }
        }
        Ok(CodeBlock::new(statements))
    }

    /// Consumes the nested block belonging to the header line just
    /// consumed by the caller. A missing block (no indented lines follow)
    /// degrades to an empty block rather than an error.
    fn read_block(&mut self, header_depth: usize) -> Result<CodeBlock, ParseError> {
        if self.at_depth(header_depth + 1) {
            self.parse_block(header_depth + 1)
        } else {
            Ok(CodeBlock::default())
        }
    }

    fn parse_statement(&mut self, depth: usize) -> Result<Statement, ParseError> {
        let line = self.peek().cloned().expect("caller checked at_depth");
        let text = line.text.trim();

        if let Some(rest) = text.strip_prefix("foreach ") {
            return self.parse_foreach(depth, rest);
        }
        if text == "parallel:" || text.starts_with("parallel ") || text.starts_with("parallel:") {
            return self.parse_parallel(depth, text);
        }
        if text == "try:" {
            return self.parse_try_catch(depth);
        }
        if let Some(rest) = text.strip_prefix("if ") {
            return self.parse_if(depth, rest);
        }
        if let Some(rest) = text.strip_prefix("while ") {
            return self.parse_while(depth, rest);
        }
        if text == "break" {
            self.advance();
            return Ok(Statement::Break);
        }
        if text == "continue" {
            self.advance();
            return Ok(Statement::Continue);
        }
        if text == "return" || text.starts_with("return ") {
            self.advance();
            let value = text.strip_prefix("return").unwrap().trim();
            return Ok(Statement::Return { value: if value.is_empty() { None } else { Some(value.to_string()) } });
        }
        if let Some(name) = text.strip_suffix(':').map(|h| h.trim()) {
            if is_plain_identifier(name) {
                self.advance();
                let body = self.read_block(depth)?;
                return Ok(Statement::Block(CodeBlock::with_type(body.statements, name)));
            }
        }
        if let Some(stmt) = self.try_parse_set_variable(text) {
            self.advance();
            return Ok(stmt);
        }
        if let Some(stages) = split_pipeline(text) {
            self.advance();
            return Ok(Statement::Pipeline { stages });
        }

        self.advance();
        let mut parts = text.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("").to_string();
        let args_text = parts.next().unwrap_or("").trim().to_string();
        Ok(Statement::Command { name, args_text })
    }

    fn try_parse_set_variable(&self, text: &str) -> Option<Statement> {
        let rest = text.strip_prefix('$')?;
        let ident_end = rest.find(|c: char| !(c.is_alphanumeric() || c == '_')).unwrap_or(rest.len());
        if ident_end == 0 {
            return None;
        }
        let name = &rest[..ident_end];
        let after = rest[ident_end..].trim_start();
        let expr = after.strip_prefix('=')?;
        if expr.starts_with('=') {
            return None; // `==` is comparison, not assignment
        }
        Some(Statement::SetVariable { name: name.to_string(), expr: expr.trim().to_string() })
    }

    fn parse_foreach(&mut self, depth: usize, rest: &str) -> Result<Statement, ParseError> {
        let line_no = self.peek().unwrap().line_no;
        self.advance();
        let rest = rest
            .strip_suffix(':')
            .ok_or_else(|| ParseError::Syntax { line: line_no, message: "foreach header must end with ':'".into() })?;
        let (item_part, collection_part) = rest
            .split_once(" in ")
            .ok_or_else(|| ParseError::Syntax { line: line_no, message: "expected 'foreach $item in <expr>:'".into() })?;
        let item_var = item_part.trim().trim_start_matches('$').to_string();
        let body = self.read_block(depth)?;
        Ok(Statement::ForEach { item_var, collection_expr: collection_part.trim().to_string(), body })
    }

    fn parse_parallel(&mut self, depth: usize, text: &str) -> Result<Statement, ParseError> {
        let line_no = self.peek().unwrap().line_no;
        self.advance();
        let header = text
            .strip_prefix("parallel")
            .unwrap()
            .trim()
            .strip_suffix(':')
            .ok_or_else(|| ParseError::Syntax { line: line_no, message: "parallel header must end with ':'".into() })?
            .trim();

        let (collection, item) = if header.is_empty() {
            (None, None)
        } else if let Some((coll, item_part)) = header.rsplit_once(" as ") {
            (Some(coll.trim().to_string()), Some(item_part.trim().trim_start_matches('$').to_string()))
        } else {
            (Some(header.to_string()), None)
        };

        let body = self.read_block(depth)?;
        Ok(Statement::Parallel { body, collection, item, max_concurrent: DEFAULT_MAX_CONCURRENT })
    }

    fn parse_try_catch(&mut self, depth: usize) -> Result<Statement, ParseError> {
        let line_no = self.peek().unwrap().line_no;
        self.advance();
        let try_block = self.read_block(depth)?;

        if !self.at_depth(depth) || self.peek().unwrap().text.trim() != "catch:" {
            return Err(ParseError::Syntax { line: line_no, message: "'try' block must be followed by 'catch:'".into() });
        }
        self.advance();
        let catch_block = self.read_block(depth)?;

        let finally_block = if self.at_depth(depth) && self.peek().unwrap().text.trim() == "finally:" {
            self.advance();
            Some(self.read_block(depth)?)
        } else {
            None
        };

        Ok(Statement::TryCatch { try_block, catch_block, finally_block })
    }

    fn parse_if(&mut self, depth: usize, rest: &str) -> Result<Statement, ParseError> {
        let line_no = self.peek().unwrap().line_no;
        self.advance();
        let condition = rest
            .strip_suffix(':')
            .ok_or_else(|| ParseError::Syntax { line: line_no, message: "if header must end with ':'".into() })?
            .trim()
            .to_string();
        let body = self.read_block(depth)?;
        let mut branches = vec![IfBranch { condition, body }];

        while self.at_depth(depth) {
            let text = self.peek().unwrap().text.trim().to_string();
            if let Some(rest) = text.strip_prefix("elseif ") {
                self.advance();
                let condition = rest.strip_suffix(':').unwrap_or(rest).trim().to_string();
                let body = self.read_block(depth)?;
                branches.push(IfBranch { condition, body });
            } else {
                break;
            }
        }

        let else_block = if self.at_depth(depth) && self.peek().unwrap().text.trim() == "else:" {
            self.advance();
            Some(self.read_block(depth)?)
        } else {
            None
        };

        Ok(Statement::If { branches, else_block })
    }

    fn parse_while(&mut self, depth: usize, rest: &str) -> Result<Statement, ParseError> {
        let line_no = self.peek().unwrap().line_no;
        self.advance();
        let condition = rest
            .strip_suffix(':')
            .ok_or_else(|| ParseError::Syntax { line: line_no, message: "while header must end with ':'".into() })?
            .trim()
            .to_string();
        let body = self.read_block(depth)?;
        Ok(Statement::While { condition, body })
    }
}

fn is_plain_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_') && s.chars().next().unwrap().is_alphabetic()
}

/// Splits on top-level (unquoted) `|`. Returns `None` for a single stage
/// (ordinary command statement) or when a `|` appears only inside quotes.
fn split_pipeline(text: &str) -> Option<Vec<String>> {
    let mut stages = Vec::new();
    let mut current = String::new();
    let mut in_quote: Option<char> = None;
    let mut found_pipe = false;
    for c in text.chars() {
        match in_quote {
            Some(q) if c == q => in_quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => in_quote = Some(c),
            None if c == '|' => {
                found_pipe = true;
                stages.push(current.trim().to_string());
                current = String::new();
                continue;
            }
            None => {}
        }
        current.push(c);
    }
    stages.push(current.trim().to_string());
    if found_pipe {
        Some(stages)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreach_with_variable_collection() {
        let block = parse_script("foreach $h in $hosts:\n  echo $h\n").unwrap();
        assert_eq!(block.statements.len(), 1);
        match &block.statements[0] {
            Statement::ForEach { item_var, collection_expr, body } => {
                assert_eq!(item_var, "h");
                assert_eq!(collection_expr, "$hosts");
                assert_eq!(body.statements.len(), 1);
            }
            other => panic!("expected ForEach, got {:?}", other),
        }
    }

    #[test]
    fn try_catch_without_finally() {
        let src = "try:\n  add-system existing existing.example.com\ncatch:\n  echo \"failed\"\n";
        let block = parse_script(src).unwrap();
        match &block.statements[0] {
            Statement::TryCatch { finally_block, .. } => assert!(finally_block.is_none()),
            other => panic!("expected TryCatch, got {:?}", other),
        }
    }

    #[test]
    fn parallel_with_collection_and_item() {
        let block = parse_script("parallel [1, 2, 3] as $i:\n  sleep-mock $i\n").unwrap();
        match &block.statements[0] {
            Statement::Parallel { collection, item, .. } => {
                assert_eq!(collection.as_deref(), Some("[1, 2, 3]"));
                assert_eq!(item.as_deref(), Some("i"));
            }
            other => panic!("expected Parallel, got {:?}", other),
        }
    }

    #[test]
    fn if_elseif_else_chain() {
        let src = "if $x:\n  echo a\nelseif $y:\n  echo b\nelse:\n  echo c\n";
        let block = parse_script(src).unwrap();
        match &block.statements[0] {
            Statement::If { branches, else_block } => {
                assert_eq!(branches.len(), 2);
                assert!(else_block.is_some());
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn set_variable_statement() {
        let block = parse_script("$count = 1 + 2\n").unwrap();
        match &block.statements[0] {
            Statement::SetVariable { name, expr } => {
                assert_eq!(name, "count");
                assert_eq!(expr, "1 + 2");
            }
            other => panic!("expected SetVariable, got {:?}", other),
        }
    }

    #[test]
    fn plain_command_statement() {
        let block = parse_script("connect prod01 -port 2222\n").unwrap();
        match &block.statements[0] {
            Statement::Command { name, args_text } => {
                assert_eq!(name, "connect");
                assert_eq!(args_text, "prod01 -port 2222");
            }
            other => panic!("expected Command, got {:?}", other),
        }
    }

    #[test]
    fn parse_line_unwraps_single_statement() {
        let stmt = parse_line("echo hi").unwrap();
        assert!(matches!(stmt, Statement::Command { .. }));
    }
}
