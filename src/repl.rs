use std::io::{BufRead, Write};

use anyhow::Result;

use crate::config::Config;
use crate::error::Error;
use crate::gc::GcStats;
use crate::interpreter::Interpreter;

const PROMPT: &str = "> ";
const QUIT: &str = "quit";

/// Reads one line at a time from `input` and evaluates it in a single session
/// until end of input or `quit`. Returns the statistics of the final
/// collection, which are also written to `output`.
pub fn start<R: BufRead, W: Write>(
    config: Config,
    quiet: bool,
    mut input: R,
    mut output: W,
) -> Result<GcStats> {
    let mut interpreter = Interpreter::with_config(config);

    if !quiet {
        writeln!(output, "Hello! This is the Monkey programming language!")?;
        writeln!(output, "Feel free to type in commands")?;
    }

    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let mut buffer = String::new();
        if input.read_line(&mut buffer)? == 0 {
            writeln!(output)?;
            break;
        }

        let line = buffer.trim_end_matches(['\n', '\r']);
        if line.trim() == QUIT {
            break;
        }

        match interpreter.evaluate(line) {
            Ok(Some(rendered)) => writeln!(output, "{rendered}")?,
            Ok(None) => {}
            Err(Error::Parse(errors)) => {
                for error in errors {
                    writeln!(output, "PARSE ERROR: {error}")?;
                }
            }
        }
    }

    let stats = interpreter.shutdown();
    writeln!(output, "{stats}")?;
    Ok(stats)
}
