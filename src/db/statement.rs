//! Statement counting.
//!
//! Both backends accept one statement per `execute`. The SQL is tokenized
//! in the backend's dialect, so semicolons inside strings, quoted
//! identifiers, comments and dollar-quoted bodies are not separators.

use super::BackendKind;
use sqlparser::dialect::{Dialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::tokenizer::{Token, Tokenizer};

/// Counts the statements in `sql`.
///
/// Returns `None` when the text cannot be tokenized; the backend then
/// reports the problem itself. Semicolons between `BEGIN` and `END` in a
/// `CREATE` statement (trigger and routine bodies) do not end it.
pub(crate) fn count_statements(backend: BackendKind, sql: &str) -> Option<usize> {
    let dialect: Box<dyn Dialect> = match backend {
        BackendKind::Sqlite => Box::new(SQLiteDialect {}),
        BackendKind::Postgres => Box::new(PostgreSqlDialect {}),
    };
    let tokens = Tokenizer::new(dialect.as_ref(), sql).tokenize().ok()?;

    let mut count = 0;
    let mut current = StatementState::default();

    for token in tokens {
        match token {
            Token::Whitespace(_) | Token::EOF => {}
            Token::SemiColon if current.body_depth == 0 => {
                if current.has_tokens {
                    count += 1;
                }
                current = StatementState::default();
            }
            Token::Word(word) if word.quote_style.is_none() => {
                current.word(&word.value);
            }
            _ => current.has_tokens = true,
        }
    }

    if current.has_tokens {
        count += 1;
    }
    Some(count)
}

#[derive(Debug, Default)]
struct StatementState {
    has_tokens: bool,
    is_create: bool,
    body_depth: usize,
    case_depth: usize,
}

impl StatementState {
    fn word(&mut self, value: &str) {
        let first = !self.has_tokens;
        self.has_tokens = true;

        if first && value.eq_ignore_ascii_case("CREATE") {
            self.is_create = true;
        } else if self.is_create && value.eq_ignore_ascii_case("BEGIN") {
            self.body_depth += 1;
        } else if self.body_depth > 0 && value.eq_ignore_ascii_case("CASE") {
            self.case_depth += 1;
        } else if self.body_depth > 0 && value.eq_ignore_ascii_case("END") {
            if self.case_depth > 0 {
                self.case_depth -= 1;
            } else {
                self.body_depth -= 1;
            }
        }
    }
}
