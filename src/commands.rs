use std::io::{self, BufRead, Split};

use thiserror::Error;
use log::*;

/// A single instruction for the allocator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Allocate `size` units to `process`.
    Request { process: String, size: u64 },
    /// Free the memory held by `process`.
    Release { process: String },
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("the command source is empty, expected the total memory size")]
    MissingHeader,
    #[error("invalid total memory size: {0}")]
    InvalidTotal(String),
    /// A line that is neither a valid `REQUEST` nor a valid
    /// `RELEASE`.
    #[error("line {line}: unknown command: {text}")]
    Unknown { line: usize, text: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Stream of commands read from a text source.
///
/// The first non-empty line holds the total memory size, and
/// every following non-empty line is one of:
///
/// ```text
/// REQUEST <process> <size>
/// RELEASE <process>
/// ```
///
/// Keywords are case-insensitive and fields are separated by
/// any amount of whitespace. Invalid lines, including lines
/// that are not valid UTF-8, are yielded as
/// `CommandError::Unknown` so that the caller can skip them
/// and go on with the next ones.
pub struct CommandSource<R> {
    lines: Split<R>,
    line_number: usize,
}

impl<R: BufRead> CommandSource<R> {
    /// Read the header of the source and return the total
    /// memory size along with the stream of commands that
    /// follow it.
    pub fn new(reader: R) -> Result<(u64, Self), CommandError> {
        let mut source = Self {
            lines: reader.split(b'\n'),
            line_number: 0,
        };

        // A header that is not valid UTF-8 is as invalid as a
        // non-numeric one.
        let header = match source.next_line() {
            None => return Err(CommandError::MissingHeader),
            Some(Err(CommandError::Unknown { text, .. })) => {
                return Err(CommandError::InvalidTotal(text));
            }
            Some(line) => line?,
        };

        let total = header
            .parse::<u64>()
            .ok()
            .filter(|total| *total > 0)
            .ok_or(CommandError::InvalidTotal(header))?;
        debug!("Total memory: {total}");

        Ok((total, source))
    }

    /// Next non-empty line, trimmed. Each line is decoded on
    /// its own, so a line that is not valid UTF-8 only costs
    /// that line: it comes out as `CommandError::Unknown`.
    fn next_line(&mut self) -> Option<Result<String, CommandError>> {
        loop {
            let bytes = match self.lines.next()? {
                Ok(bytes) => bytes,
                Err(error) => return Some(Err(error.into())),
            };
            self.line_number += 1;

            let line = match String::from_utf8(bytes) {
                Ok(line) => line,
                Err(error) => {
                    let text = String::from_utf8_lossy(error.as_bytes());
                    return Some(Err(CommandError::Unknown {
                        line: self.line_number,
                        text: text.trim().to_string(),
                    }));
                }
            };

            let line = line.trim();
            if !line.is_empty() {
                return Some(Ok(line.to_string()));
            }
        }
    }
}

impl<R: BufRead> Iterator for CommandSource<R> {
    type Item = Result<Command, CommandError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.next_line()? {
            Ok(line) => line,
            Err(error) => return Some(Err(error)),
        };

        let command = parse_command(&line).ok_or(CommandError::Unknown {
            line: self.line_number,
            text: line,
        });

        if let Ok(command) = &command {
            trace!("Line {}: {command:?}", self.line_number);
        }
        Some(command)
    }
}

fn parse_command(line: &str) -> Option<Command> {
    let mut fields = line.split_whitespace();
    let keyword = fields.next()?;

    let command = if keyword.eq_ignore_ascii_case("REQUEST") {
        let process = fields.next()?.to_string();
        let size = fields.next()?.parse().ok()?;
        Command::Request { process, size }
    } else if keyword.eq_ignore_ascii_case("RELEASE") {
        let process = fields.next()?.to_string();
        Command::Release { process }
    } else {
        return None;
    };

    // Trailing fields make the whole line invalid.
    fields.next().is_none().then_some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str) -> (u64, CommandSource<&[u8]>) {
        CommandSource::new(text.as_bytes()).unwrap()
    }

    fn request(process: &str, size: u64) -> Command {
        Command::Request {
            process: process.to_string(),
            size,
        }
    }

    fn release(process: &str) -> Command {
        Command::Release {
            process: process.to_string(),
        }
    }

    #[test]
    fn reads_header_and_commands() {
        let (total, commands) = source("1024\nREQUEST P1 100\nRELEASE P1\n");
        let commands: Vec<_> = commands.map(Result::unwrap).collect();

        assert_eq!(total, 1024);
        assert_eq!(commands, [request("P1", 100), release("P1")]);
    }

    #[test]
    fn skips_blank_lines_and_trims() {
        let text = "\n  \n  512  \n\n   request   A   10  \n\t\nRelease\tA\n\n";
        let (total, commands) = source(text);
        let commands: Vec<_> = commands.map(Result::unwrap).collect();

        assert_eq!(total, 512);
        assert_eq!(commands, [request("A", 10), release("A")]);
    }

    #[test]
    fn zero_size_is_left_to_the_allocator() {
        let (_, mut commands) = source("100\nREQUEST P 0\n");
        assert_eq!(commands.next().unwrap().unwrap(), request("P", 0));
    }

    #[test]
    fn invalid_lines_are_reported_and_skipped() {
        let text = "100\n\
            ALLOCATE P 10\n\
            REQUEST P\n\
            REQUEST P -5\n\
            REQUEST P ten\n\
            RELEASE\n\
            RELEASE P extra\n\
            REQUEST Q 20\n";
        let (_, commands) = source(text);
        let results: Vec<_> = commands.collect();
        assert_eq!(results.len(), 7);

        let unknown: Vec<_> = results[..6]
            .iter()
            .map(|result| match result {
                Err(CommandError::Unknown { line, .. }) => *line,
                other => panic!("expected an unknown command, got {other:?}"),
            })
            .collect();
        assert_eq!(unknown, [2, 3, 4, 5, 6, 7]);

        assert_eq!(results[6].as_ref().unwrap(), &request("Q", 20));
    }

    #[test]
    fn line_numbers_count_blank_lines() {
        let (_, mut commands) = source("100\n\n\nBOGUS\n");

        match commands.next() {
            Some(Err(CommandError::Unknown { line, text })) => {
                assert_eq!(line, 4);
                assert_eq!(text, "BOGUS");
            }
            other => panic!("expected an unknown command, got {other:?}"),
        }
        assert!(commands.next().is_none());
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let text = b"100\nREQUEST A 10\nREQUEST \xff\xfe 5\r\nREQUEST B 20\n";
        let (total, commands) = CommandSource::new(&text[..]).unwrap();
        let results: Vec<_> = commands.collect();

        assert_eq!(total, 100);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &request("A", 10));
        assert!(matches!(
            results[1],
            Err(CommandError::Unknown { line: 3, .. })
        ));
        assert_eq!(results[2].as_ref().unwrap(), &request("B", 20));
    }

    #[test]
    fn invalid_utf8_header() {
        assert!(matches!(
            CommandSource::new(&b"10\xff24\n"[..]),
            Err(CommandError::InvalidTotal(_))
        ));
    }

    #[test]
    fn read_error_is_reported() {
        struct Broken;

        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
            }
        }

        let reader = io::BufReader::new(io::Read::chain(&b"100\n"[..], Broken));
        let (_, mut commands) = CommandSource::new(reader).unwrap();
        assert!(matches!(commands.next(), Some(Err(CommandError::Io(_)))));
    }

    #[test]
    fn missing_header() {
        assert!(matches!(
            CommandSource::new("\n\n".as_bytes()),
            Err(CommandError::MissingHeader)
        ));
    }

    #[test]
    fn invalid_header() {
        for header in ["zero", "0", "-10", "REQUEST P 10"] {
            match CommandSource::new(header.as_bytes()) {
                Err(CommandError::InvalidTotal(text)) => assert_eq!(text, header),
                other => panic!("expected an invalid total for {header:?}, got {:?}", other.err()),
            }
        }
    }
}
