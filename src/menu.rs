use std::io::{self, BufRead, Write};

pub const BANNER: &str = "Let's run the E2E tests...\n \
                          1 - Prepare Environment\n \
                          2 - Run E2E test\n \
                          3 - Exit and clean\n \
                          4 - Exit";

pub const PROMPT: &str = "Please enter Desired operation: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    PrepareEnvironment,
    RunTests,
    ExitAndClean,
    Exit,
}

impl Operation {
    pub fn from_selection(selection: i64) -> Option<Self> {
        match selection {
            1 => Some(Operation::PrepareEnvironment),
            2 => Some(Operation::RunTests),
            3 => Some(Operation::ExitAndClean),
            4 => Some(Operation::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Operation(Operation),
    Unknown(String),
    EndOfInput,
}

/// Print the menu and read one line of input. Bytes that are not UTF-8 end up
/// as an unknown selection; only I/O failures are errors.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<Selection> {
    writeln!(output, "{BANNER}")?;
    write!(output, "{PROMPT}")?;
    output.flush()?;

    let mut line = Vec::new();
    if input.read_until(b'\n', &mut line)? == 0 {
        return Ok(Selection::EndOfInput);
    }

    Ok(parse_selection(&String::from_utf8_lossy(&line)))
}

pub fn parse_selection(line: &str) -> Selection {
    let trimmed = line.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .and_then(Operation::from_selection)
        .map(Selection::Operation)
        .unwrap_or_else(|| Selection::Unknown(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{Operation, Selection, parse_selection, prompt};

    #[test]
    fn parses_known_operations() {
        assert_eq!(
            parse_selection("1\n"),
            Selection::Operation(Operation::PrepareEnvironment)
        );
        assert_eq!(
            parse_selection(" 3 "),
            Selection::Operation(Operation::ExitAndClean)
        );
        assert_eq!(parse_selection("4"), Selection::Operation(Operation::Exit));
    }

    #[test]
    fn out_of_range_and_garbage_are_unknown() {
        for input in ["0", "5", "-1", "abc", "", "2.5"] {
            assert!(matches!(parse_selection(input), Selection::Unknown(_)), "{input}");
        }
    }

    #[test]
    fn prompt_prints_banner_and_reads_one_line() {
        let mut input = Cursor::new("2\n4\n");
        let mut output = Vec::new();

        let first = prompt(&mut input, &mut output).unwrap();
        assert_eq!(first, Selection::Operation(Operation::RunTests));

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("Let's run the E2E tests...\n 1 - Prepare Environment\n"));
        assert!(text.ends_with("Please enter Desired operation: "));

        let second = prompt(&mut input, &mut Vec::<u8>::new()).unwrap();
        assert_eq!(second, Selection::Operation(Operation::Exit));
    }

    #[test]
    fn invalid_utf8_is_unknown() {
        let mut input = Cursor::new(vec![0xff, b'\n', b'1', b'\n']);
        let first = prompt(&mut input, &mut Vec::<u8>::new()).unwrap();
        assert!(matches!(first, Selection::Unknown(_)));

        let second = prompt(&mut input, &mut Vec::<u8>::new()).unwrap();
        assert_eq!(second, Selection::Operation(Operation::PrepareEnvironment));
    }

    #[test]
    fn empty_input_is_end_of_input() {
        let mut input = Cursor::new("");
        assert_eq!(
            prompt(&mut input, &mut Vec::<u8>::new()).unwrap(),
            Selection::EndOfInput
        );
    }
}
