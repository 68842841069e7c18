use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{Highlighter, MatchingBracketHighlighter};
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::validate::{MatchingBracketValidator, ValidationContext, ValidationResult, Validator};
use rustyline::{
    Cmd, CompletionType, Config, Context, EditMode, Editor, Helper, KeyPress, OutputStreamType,
};
use std::borrow::Cow::{self, Borrowed, Owned};
use std::collections::BTreeSet;

pub fn get_editor() -> Editor<SExprHelper> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .output_stream(OutputStreamType::Stdout)
        .build();

    let mut rl = Editor::with_config(config);
    rl.set_helper(Some(SExprHelper {
        identifiers: BTreeSet::new(),
        highlighter: MatchingBracketHighlighter::new(),
        validator: MatchingBracketValidator::new(),
        hinter: HistoryHinter {},
        colored_prompt: "\x1b[1;32m>>\x1b[0m ".to_owned(),
    }));
    rl.bind_sequence(KeyPress::Up, Cmd::HistorySearchBackward);
    rl.bind_sequence(KeyPress::Down, Cmd::HistorySearchForward);
    rl
}

///! Line editor helper: completes identifiers seen earlier in the session and keeps reading
///! lines until parentheses balance
pub struct SExprHelper {
    identifiers: BTreeSet<String>,
    highlighter: MatchingBracketHighlighter,
    validator: MatchingBracketValidator,
    hinter: HistoryHinter,
    colored_prompt: String,
}

impl SExprHelper {
    pub fn remember<I>(&mut self, identifiers: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.identifiers.extend(identifiers);
    }

    fn candidates(&self, prefix: &str) -> Vec<Pair> {
        self.identifiers
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| Pair {
                display: name.clone(),
                replacement: name.clone(),
            })
            .collect()
    }
}

///! Start of the word ending at `pos`
fn word_start(line: &str, pos: usize) -> usize {
    line[..pos]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || *c == '(' || *c == ')')
        .map_or(0, |(i, c)| i + c.len_utf8())
}

impl Hinter for SExprHelper {
    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for SExprHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default {
            Borrowed(&self.colored_prompt)
        } else {
            Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned("\x1b[1m".to_owned() + hint + "\x1b[m")
    }

    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        self.highlighter.highlight(line, pos)
    }

    fn highlight_char(&self, line: &str, pos: usize) -> bool {
        self.highlighter.highlight_char(line, pos)
    }
}

impl Validator for SExprHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        self.validator.validate(ctx)
    }

    fn validate_while_typing(&self) -> bool {
        self.validator.validate_while_typing()
    }
}

impl Completer for SExprHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let start = word_start(line, pos);
        Ok((start, self.candidates(&line[start..pos])))
    }
}

impl Helper for SExprHelper {}

#[cfg(test)]
mod tests {
    use super::word_start;

    #[test]
    fn word_boundaries() {
        assert_eq!(word_start("(foo (ba", 8), 6);
        assert_eq!(word_start("sph", 3), 0);
        assert_eq!(word_start("(a b ", 5), 5);
        let line = "(foo\u{3000}ba";
        let start = word_start(line, line.len());
        assert_eq!(&line[start..], "ba");
    }
}
