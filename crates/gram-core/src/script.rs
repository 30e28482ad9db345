//! The `exec` command's script host.
//!
//! A script is a `;`-separated list of statements run against the
//! editor, e.g. `open notes.txt; goto 3:0; insert TODO\n; save`. The
//! first failing statement stops the script.
//!
//! | Statement        | Effect                                   |
//! |------------------|------------------------------------------|
//! | `open <path>`    | open a file                              |
//! | `tab <fragment>` | switch to an open buffer                 |
//! | `find <text>`    | select the next match                    |
//! | `goto <l>[:<c>]` | move the cursor (1-based line)           |
//! | `insert <text>`  | type text; `\n` and `\t` are unescaped   |
//! | `save`           | save the active buffer                   |
//! | `close`          | close the active buffer                  |
//! | `debug on\|off`  | toggle command logging                   |
//! | `print <text>`   | write to the log                         |
//! | `buffers`        | log the open buffers                     |

use gram_buffer::Position;
use tracing::info;

use crate::editor::Editor;
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Open(String),
    Tab(String),
    Find(String),
    Goto(Position),
    Insert(String),
    Save,
    Close,
    Debug(bool),
    Print(String),
    Buffers,
}

impl Statement {
    pub fn parse(source: &str) -> CoreResult<Self> {
        let source = source.trim();
        let (word, arg) = source.split_once(' ').unwrap_or((source, ""));
        let arg = arg.trim();

        let statement = match word {
            "open" => Statement::Open(required(word, arg)?),
            "tab" => Statement::Tab(required(word, arg)?),
            "find" => Statement::Find(required(word, arg)?),
            "goto" => Statement::Goto(parse_location(arg)?),
            "insert" => Statement::Insert(unescape(arg)),
            "save" => Statement::Save,
            "close" => Statement::Close,
            "debug" => match arg {
                "on" => Statement::Debug(true),
                "off" => Statement::Debug(false),
                other => return Err(CoreError::Script(format!("debug takes on|off, not '{}'", other))),
            },
            "print" => Statement::Print(arg.to_string()),
            "buffers" => Statement::Buffers,
            other => return Err(CoreError::Script(format!("unknown statement '{}'", other))),
        };
        Ok(statement)
    }
}

fn required(word: &str, arg: &str) -> CoreResult<String> {
    if arg.is_empty() {
        return Err(CoreError::Script(format!("{} needs an argument", word)));
    }
    Ok(arg.to_string())
}

fn parse_location(arg: &str) -> CoreResult<Position> {
    let bad = || CoreError::Script(format!("bad location '{}'", arg));
    let (line, column) = arg.split_once(':').unwrap_or((arg, "0"));
    let line: usize = line.trim().parse().map_err(|_| bad())?;
    let column: usize = column.trim().parse().map_err(|_| bad())?;
    Ok(Position::new(line.saturating_sub(1), column))
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Splits a script into statements, skipping empty ones.
pub fn parse(source: &str) -> CoreResult<Vec<Statement>> {
    source
        .split(';')
        .filter(|s| !s.trim().is_empty())
        .map(Statement::parse)
        .collect()
}

/// Runs a script statement by statement, stopping at the first one that
/// does not parse or fails.
pub fn run(editor: &mut Editor, source: &str) -> CoreResult<()> {
    for part in source.split(';').filter(|s| !s.trim().is_empty()) {
        execute(editor, Statement::parse(part)?)?;
    }
    Ok(())
}

fn execute(editor: &mut Editor, statement: Statement) -> CoreResult<()> {
    match statement {
        Statement::Open(path) => editor.open_path(&path),
        Statement::Tab(fragment) => editor.switch_tab(&fragment, false),
        Statement::Find(text) => editor.find(&text, false).map(|_| ()),
        Statement::Goto(position) => editor.with_view(|view| view.goto(position)),
        Statement::Insert(text) => editor.insert_text(&text),
        Statement::Save => editor.save_active(),
        Statement::Close => editor.close_active(),
        Statement::Debug(on) => {
            editor.set_debug(on);
            Ok(())
        }
        Statement::Print(text) => {
            info!("{}", text);
            Ok(())
        }
        Statement::Buffers => {
            for path in editor.store.paths() {
                info!("file://{}", path.display());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use std::fs;

    #[test]
    fn test_parse() {
        let statements = parse("open a.txt; goto 3:2 ;insert x\\ty\\n; save;").unwrap();
        assert_eq!(
            statements,
            vec![
                Statement::Open("a.txt".into()),
                Statement::Goto(Position::new(2, 2)),
                Statement::Insert("x\ty\n".into()),
                Statement::Save,
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("explode"), Err(CoreError::Script(_))));
        assert!(matches!(parse("goto x:1"), Err(CoreError::Script(_))));
        assert!(matches!(parse("open"), Err(CoreError::Script(_))));
        assert!(matches!(parse("debug maybe"), Err(CoreError::Script(_))));
    }

    #[test]
    fn test_run_edits_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().join("data")))
            .unwrap()
            .with_workdir(dir.path());
        let mut editor = Editor::new(session).unwrap();
        fs::write(dir.path().join("a.txt"), "one\ntwo\n").unwrap();

        run(&mut editor, "open a.txt; goto 2; insert >>\\t; save").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "one\n>>\ttwo\n"
        );
    }
}
