use std::io::{BufRead, Write};

use anyhow::Result;

use crate::schema::{CompleteStoryResponse, StoryNodeResponse};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    Won,
    Lost,
    /// An option led to a node that does not exist.
    DeadEnd,
    Quit,
}

/// Walks the story from its root, reading one choice per line.
///
/// Choices are 1-based option numbers; `q` quits. Input that is not a valid
/// choice is asked again. End of input counts as quitting.
pub fn play_story<R: BufRead, W: Write>(
    story: &CompleteStoryResponse,
    mut input: R,
    mut output: W,
) -> Result<PlayOutcome> {
    writeln!(output, "{}", story.story.title)?;
    writeln!(output)?;

    let mut current: &StoryNodeResponse = &story.root_node;
    loop {
        writeln!(output, "{}", current.content)?;

        if current.ending.is_ending {
            if current.ending.is_winning_ending {
                writeln!(output, "\nCongratulations! You reached a winning ending.")?;
                return Ok(PlayOutcome::Won);
            }
            writeln!(output, "\nThe End.")?;
            return Ok(PlayOutcome::Lost);
        }

        if current.options.is_empty() {
            writeln!(output, "\nThe story stops here.")?;
            return Ok(PlayOutcome::DeadEnd);
        }

        writeln!(output)?;
        for (i, option) in current.options.iter().enumerate() {
            writeln!(output, "  {}. {}", i + 1, option.text)?;
        }

        let choice = loop {
            write!(output, "> ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(PlayOutcome::Quit);
            }
            let line = line.trim();
            if line.eq_ignore_ascii_case("q") {
                return Ok(PlayOutcome::Quit);
            }
            match line.parse::<usize>() {
                Ok(n) if (1..=current.options.len()).contains(&n) => break n - 1,
                _ => writeln!(output, "Pick a number between 1 and {}.", current.options.len())?,
            }
        };

        match story.follow(current.id, choice) {
            Some(next) => {
                writeln!(output)?;
                current = next;
            }
            None => {
                writeln!(output, "\nThis path leads nowhere. The story ends here.")?;
                return Ok(PlayOutcome::DeadEnd);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn story() -> CompleteStoryResponse {
        serde_json::from_value(json!({
            "id": 1,
            "title": "Cave",
            "session_id": "s",
            "created_at": "2024-01-01T00:00:00Z",
            "root_node": {"id": 1, "content": "A cave.", "is_ending": false,
                          "is_winning_ending": false,
                          "options": [{"text": "In", "node_id": 2},
                                      {"text": "Away", "node_id": 3},
                                      {"text": "Void", "node_id": 99}]},
            "all_nodes": {
                "1": {"id": 1, "content": "A cave.", "is_ending": false,
                      "is_winning_ending": false,
                      "options": [{"text": "In", "node_id": 2},
                                  {"text": "Away", "node_id": 3},
                                  {"text": "Void", "node_id": 99}]},
                "2": {"id": 2, "content": "Gold!", "is_ending": true,
                      "is_winning_ending": true, "options": []},
                "3": {"id": 3, "content": "You leave.", "is_ending": true,
                      "is_winning_ending": false, "options": []}
            }
        }))
        .unwrap()
    }

    fn play(input: &str) -> (PlayOutcome, String) {
        let mut output = Vec::new();
        let outcome = play_story(&story(), Cursor::new(input.to_string()), &mut output).unwrap();
        (outcome, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_winning_path() {
        let (outcome, output) = play("1\n");
        assert_eq!(outcome, PlayOutcome::Won);
        assert!(output.contains("Gold!"));
    }

    #[test]
    fn test_losing_path_after_bad_input() {
        let (outcome, output) = play("7\nabc\n2\n");
        assert_eq!(outcome, PlayOutcome::Lost);
        assert!(output.contains("Pick a number between 1 and 3."));
    }

    #[test]
    fn test_dangling_option_is_dead_end() {
        let (outcome, output) = play("3\n");
        assert_eq!(outcome, PlayOutcome::DeadEnd);
        assert!(output.contains("leads nowhere"));
    }

    #[test]
    fn test_quit_and_eof() {
        assert_eq!(play("q\n").0, PlayOutcome::Quit);
        assert_eq!(play("").0, PlayOutcome::Quit);
    }
}
