//! Line-oriented interactive session over the tracker operations.

use std::fmt;

use services::{TrackerError, TrackerService};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracker_core::model::{
    Difficulty, DifficultyError, ListName, ProblemRow, QuestionNumber, TAG_SEPARATOR, TagName,
};

const HELP: &str = "\
Commands:
  lists                              loaded lists and predefined intersections
  show <list>                        problems in a list
  intersect <list> <list>            problems in both lists
  intersect <id>                     a predefined intersection
  done <q> [easy|medium|hard|none]   mark solved, optionally setting difficulty
  undone <q>                         mark unsolved
  difficulty <q> <easy|medium|hard|none>
  tags                               all tags
  tags <q>                           tags on a question
  tag add <name>                     create a tag
  tag rm <name>                      delete a tag and its assignments
  tag set <q> [name, name, ...]      replace a question's tags
  help
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Lists,
    Show(ListName),
    Intersect { left: ListName, right: ListName },
    IntersectPreset(String),
    Done {
        question: QuestionNumber,
        difficulty: Option<Difficulty>,
    },
    Undone(QuestionNumber),
    SetDifficulty(QuestionNumber, Difficulty),
    Tags,
    QuestionTags(QuestionNumber),
    TagAdd(TagName),
    TagRemove(TagName),
    TagSet(QuestionNumber, Vec<TagName>),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Unknown(String),
    Usage(&'static str),
    InvalidQuestion(String),
    Invalid(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(cmd) => write!(f, "unknown command: {cmd} (try `help`)"),
            CommandError::Usage(usage) => write!(f, "usage: {usage}"),
            CommandError::InvalidQuestion(raw) => write!(f, "invalid question number: {raw}"),
            CommandError::Invalid(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for CommandError {}

fn question(raw: &str) -> Result<QuestionNumber, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidQuestion(raw.to_string()))
}

fn list_name(raw: &str) -> Result<ListName, CommandError> {
    ListName::new(raw).map_err(|e| CommandError::Invalid(format!("{e}: {raw}")))
}

fn tag_name(raw: &str) -> Result<TagName, CommandError> {
    TagName::new(raw).map_err(|e| CommandError::Invalid(e.to_string()))
}

fn difficulty(raw: &str) -> Result<Difficulty, CommandError> {
    raw.parse()
        .map_err(|e: DifficultyError| CommandError::Invalid(e.to_string()))
}

/// Split off the first whitespace-delimited word.
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    }
}

impl SessionCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` for unknown commands or malformed arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let (cmd, rest) = split_word(line);
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match (cmd, args.as_slice()) {
            ("", _) => return Ok(None),
            ("lists", []) => Self::Lists,
            ("lists", _) => return Err(CommandError::Usage("lists")),
            ("show", [list]) => Self::Show(list_name(list)?),
            ("show", _) => return Err(CommandError::Usage("show <list>")),
            ("intersect", [id]) => Self::IntersectPreset((*id).to_string()),
            ("intersect", [left, right]) => Self::Intersect {
                left: list_name(left)?,
                right: list_name(right)?,
            },
            ("intersect", _) => {
                return Err(CommandError::Usage("intersect <list> <list> | intersect <id>"));
            }
            ("done", [q]) => Self::Done {
                question: question(q)?,
                difficulty: None,
            },
            ("done", [q, d]) => Self::Done {
                question: question(q)?,
                difficulty: Some(difficulty(d)?),
            },
            ("done", _) => return Err(CommandError::Usage("done <q> [difficulty]")),
            ("undone", [q]) => Self::Undone(question(q)?),
            ("undone", _) => return Err(CommandError::Usage("undone <q>")),
            ("difficulty", [q, d]) => Self::SetDifficulty(question(q)?, difficulty(d)?),
            ("difficulty", _) => {
                return Err(CommandError::Usage("difficulty <q> <easy|medium|hard|none>"));
            }
            ("tags", []) => Self::Tags,
            ("tags", [q]) => Self::QuestionTags(question(q)?),
            ("tags", _) => return Err(CommandError::Usage("tags [q]")),
            ("tag", _) => Self::parse_tag(rest)?,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    fn parse_tag(rest: &str) -> Result<Self, CommandError> {
        let (sub, rest) = split_word(rest);
        match sub {
            "add" if !rest.is_empty() => Ok(Self::TagAdd(tag_name(rest)?)),
            "add" => Err(CommandError::Usage("tag add <name>")),
            "rm" if !rest.is_empty() => Ok(Self::TagRemove(tag_name(rest)?)),
            "rm" => Err(CommandError::Usage("tag rm <name>")),
            "set" => {
                let (q, names) = split_word(rest);
                if q.is_empty() {
                    return Err(CommandError::Usage("tag set <q> [name, name, ...]"));
                }
                let tags = names
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(tag_name)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::TagSet(question(q)?, tags))
            }
            _ => Err(CommandError::Usage("tag add|rm|set ...")),
        }
    }
}

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

fn render_rows(title: &str, rows: &[ProblemRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push(title.to_string());
    lines.push(format!(
        "{:>6}  {:<4}  {:<6}  {:<48}  Tags",
        "#", "Done", "Level", "Problem"
    ));
    lines.extend(rows.iter().map(|row| {
        format!(
            "{:>6}  {:<4}  {:<6}  {:<48}  {}",
            row.question_number.value(),
            if row.done { "[x]" } else { "[ ]" },
            row.difficulty.as_str(),
            row.problem_name,
            row.tags_label()
        )
    }));
    lines.push(TrackerService::compute_metrics(rows).to_string());
    lines.join("\n")
}

/// Run one parsed command against the tracker.
///
/// # Errors
///
/// Returns the `TrackerError` from the underlying operation.
pub async fn execute(
    tracker: &TrackerService,
    command: SessionCommand,
) -> Result<Outcome, TrackerError> {
    let text = match command {
        SessionCommand::Lists => {
            let mut lines = vec!["Lists:".to_string()];
            lines.extend(tracker.list_summaries().await?.iter().map(|summary| {
                format!(
                    "  {:<24} {:<28} {:>5} problems",
                    summary.name.as_str(),
                    summary.display_name,
                    summary.total
                )
            }));
            lines.push("Intersections:".to_string());
            lines.extend(tracker.intersections().iter().map(|spec| {
                format!(
                    "  {:<24} {} ({} / {})",
                    spec.id, spec.display_name, spec.left, spec.right
                )
            }));
            lines.join("\n")
        }
        SessionCommand::Show(list) => {
            let rows = tracker.list_problems(&list).await?;
            let title = tracker
                .catalog()
                .list(&list)
                .map_or_else(|| list.to_string(), |spec| spec.display_name.clone());
            render_rows(&title, &rows)
        }
        SessionCommand::Intersect { left, right } => {
            let rows = tracker.list_intersection(&left, &right).await?;
            render_rows(&format!("{left} and {right}"), &rows)
        }
        SessionCommand::IntersectPreset(id) => {
            let (spec, rows) = tracker.catalog_intersection(&id).await?;
            render_rows(&spec.display_name, &rows)
        }
        SessionCommand::Done {
            question,
            difficulty,
        } => {
            let current = tracker.status(question).await?;
            let difficulty = difficulty.unwrap_or(current.difficulty);
            tracker.save_status(question, true, difficulty).await?;
            format!("{question} marked done")
        }
        SessionCommand::Undone(question) => {
            let current = tracker.status(question).await?;
            tracker
                .save_status(question, false, current.difficulty)
                .await?;
            format!("{question} marked not done")
        }
        SessionCommand::SetDifficulty(question, difficulty) => {
            let current = tracker.status(question).await?;
            tracker
                .save_status(question, current.done, difficulty)
                .await?;
            if difficulty.is_set() {
                format!("{question} difficulty set to {difficulty}")
            } else {
                format!("{question} difficulty cleared")
            }
        }
        SessionCommand::Tags => {
            let tags = tracker.tags().await?;
            if tags.is_empty() {
                "no tags".to_string()
            } else {
                tags.iter()
                    .map(TagName::as_str)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        SessionCommand::QuestionTags(question) => {
            let tags = tracker.question_tags(question).await?;
            let label = tags
                .iter()
                .map(TagName::as_str)
                .collect::<Vec<_>>()
                .join(TAG_SEPARATOR);
            format!("{question}: {label}")
        }
        SessionCommand::TagAdd(tag) => {
            let text = format!("added tag \"{tag}\"");
            tracker.add_tag(tag).await?;
            text
        }
        SessionCommand::TagRemove(tag) => {
            let removed = tracker.delete_tag(&tag).await?;
            format!("deleted tag \"{tag}\" ({removed} assignments removed)")
        }
        SessionCommand::TagSet(question, tags) => {
            tracker.set_tags_for_question(question, tags).await?;
            let current = tracker.question_tags(question).await?;
            format!("{question}: {} tags", current.len())
        }
        SessionCommand::Help => HELP.to_string(),
        SessionCommand::Quit => return Ok(Outcome::Quit),
    };
    Ok(Outcome::Continue(text))
}

/// Read commands from `input` until `quit` or end of input.
///
/// Command failures are printed and the session continues.
///
/// # Errors
///
/// Returns an I/O error if reading input or writing output fails.
pub async fn run<R, W>(tracker: &TrackerService, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output
        .write_all(b"Interview practice tracker. Type `help` for commands.\n")
        .await?;

    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let reply = match SessionCommand::parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => match execute(tracker, command).await {
                Ok(Outcome::Quit) => break,
                Ok(Outcome::Continue(text)) => text,
                Err(err) => {
                    tracing::debug!(error = ?err, "command failed");
                    format!("error: {err}")
                }
            },
            Err(err) => format!("error: {err}"),
        };
        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }

    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::{LoadedList, Storage};
    use tracker_core::model::{Catalog, ListEntry};

    fn q(n: u32) -> QuestionNumber {
        QuestionNumber::new(n)
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(SessionCommand::parse("   ").unwrap(), None);
        assert_eq!(
            SessionCommand::parse("show neetcode_150").unwrap(),
            Some(SessionCommand::Show(ListName::new("neetcode_150").unwrap()))
        );
        assert_eq!(
            SessionCommand::parse("done 42 Medium").unwrap(),
            Some(SessionCommand::Done {
                question: q(42),
                difficulty: Some(Difficulty::Medium)
            })
        );
        assert_eq!(
            SessionCommand::parse("difficulty 7 none").unwrap(),
            Some(SessionCommand::SetDifficulty(q(7), Difficulty::Unset))
        );
        assert_eq!(
            SessionCommand::parse("intersect meta_x_neetcode").unwrap(),
            Some(SessionCommand::IntersectPreset("meta_x_neetcode".into()))
        );
    }

    #[test]
    fn tag_names_keep_inner_spaces() {
        assert_eq!(
            SessionCommand::parse("tag add sliding window").unwrap(),
            Some(SessionCommand::TagAdd(TagName::new("sliding window").unwrap()))
        );
        assert_eq!(
            SessionCommand::parse("tag set 3 dp, sliding window ,").unwrap(),
            Some(SessionCommand::TagSet(
                q(3),
                vec![
                    TagName::new("dp").unwrap(),
                    TagName::new("sliding window").unwrap()
                ]
            ))
        );
        assert_eq!(
            SessionCommand::parse("tag set 3").unwrap(),
            Some(SessionCommand::TagSet(q(3), Vec::new()))
        );
    }

    #[test]
    fn malformed_input_is_reported() {
        assert_eq!(
            SessionCommand::parse("frobnicate").unwrap_err(),
            CommandError::Unknown("frobnicate".into())
        );
        assert!(matches!(
            SessionCommand::parse("done x").unwrap_err(),
            CommandError::InvalidQuestion(_)
        ));
        assert!(matches!(
            SessionCommand::parse("done 1 brutal").unwrap_err(),
            CommandError::Invalid(_)
        ));
        assert!(matches!(
            SessionCommand::parse("show Bad-Name").unwrap_err(),
            CommandError::Invalid(_)
        ));
        assert!(matches!(
            SessionCommand::parse("tag add").unwrap_err(),
            CommandError::Usage(_)
        ));
    }

    #[test]
    fn rows_render_as_table_with_metrics() {
        let mut row = ProblemRow::from_entry(ListEntry::new(q(217), "Contains Duplicate"));
        row.done = true;
        row.difficulty = Difficulty::Easy;
        let text = render_rows("NeetCode 150", &[row]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "NeetCode 150");
        assert!(lines[2].starts_with("   217  [x]   Easy"));
        assert_eq!(lines[3], "1/1 completed (100.0%)");
    }

    async fn tracker() -> TrackerService {
        let storage = Storage::in_memory();
        let list = LoadedList {
            name: ListName::new("neetcode_150").unwrap(),
            display_name: "NeetCode 150".into(),
            source_file: "neetcode_150.csv".into(),
            entries: vec![
                ListEntry::new(q(1), "Two Sum"),
                ListEntry::new(q(217), "Contains Duplicate"),
            ],
        };
        storage
            .loader
            .reconcile(&[list], &[ListName::new("neetcode_150").unwrap()])
            .await
            .unwrap();
        TrackerService::from_storage(Catalog::builtin(), &storage)
    }

    #[tokio::test]
    async fn done_keeps_existing_difficulty() {
        let tracker = tracker().await;
        execute(&tracker, SessionCommand::SetDifficulty(q(1), Difficulty::Hard))
            .await
            .unwrap();
        execute(
            &tracker,
            SessionCommand::Done {
                question: q(1),
                difficulty: None,
            },
        )
        .await
        .unwrap();

        let status = tracker.status(q(1)).await.unwrap();
        assert!(status.done);
        assert_eq!(status.difficulty, Difficulty::Hard);
    }

    #[tokio::test]
    async fn session_continues_after_errors() {
        let tracker = tracker().await;
        let input = b"tag add dp\ntag add dp\ntag set 1 dp\nshow neetcode_150\nshow pinterest\nquit\nlists\n";
        let mut output = Vec::new();
        run(&tracker, &input[..], &mut output).await.unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("added tag \"dp\""));
        assert!(text.contains("error: tag \"dp\" already exists"));
        assert!(text.contains("0/2 completed (0.0%)"));
        assert!(text.contains("error: unknown list: pinterest"));
        // Nothing after `quit` runs.
        assert!(!text.contains("Intersections:"));
        assert_eq!(tracker.question_tags(q(1)).await.unwrap().len(), 1);
    }
}
