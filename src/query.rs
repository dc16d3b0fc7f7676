use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::info::Facts;

pub const PROMPT: &str = "What would you want to know about me?";

/// An answer to the [`PROMPT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Cpu,
    TotalMem,
    FreeMem,
    /// Anything that is not recognized, including the empty answer.
    Other(String),
}

impl From<&str> for Query {
    /// Matches the answer exactly. No case folding or trimming takes place.
    fn from(s: &str) -> Self {
        match s {
            "cpu" => Self::Cpu,
            "totalmem" => Self::TotalMem,
            "freemem" => Self::FreeMem,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Reads a single line from `input` and strips its line terminator.
///
/// Reaching the end of the input before any line is read results in an empty answer. Invalid
/// UTF-8 is replaced rather than rejected.
pub fn read_answer(input: &mut impl BufRead) -> Result<String> {
    let mut buf = Vec::new();
    input.read_until(b'\n', &mut buf).context("could not read answer")?;
    let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Ok(String::from_utf8_lossy(line).into_owned())
}

/// Asks the [`PROMPT`], echoes the answer, and writes the requested fact if it is recognized.
///
/// When `interactive` is false the prompt is terminated with a newline, since there is no terminal
/// echoing the user's enter key to end the line.
pub fn ask(
    mut input: impl BufRead,
    mut output: impl Write,
    facts: &impl Facts,
    interactive: bool,
) -> Result<Query> {
    write!(output, "{PROMPT}").context("could not write prompt")?;
    if !interactive {
        writeln!(output).context("could not write prompt")?;
    }
    output.flush().context("could not write prompt")?;

    let answer = read_answer(&mut input)?;
    writeln!(output, "{answer}").context("could not echo answer")?;

    let query = Query::from(answer.as_str());
    match &query {
        Query::Cpu => {
            serde_json::to_writer(&mut output, &facts.cpus())
                .context("could not write cpu information")?;
            writeln!(output).context("could not write cpu information")?;
        }
        Query::TotalMem => {
            writeln!(output, "{}", facts.total_memory()).context("could not write total memory")?;
        }
        Query::FreeMem => {
            writeln!(output, "{}", facts.free_memory()).context("could not write free memory")?;
        }
        Query::Other(_) => {}
    }
    output.flush().context("could not flush output")?;

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{Cpu, CpuTimes};

    struct Fixed;

    impl Facts for Fixed {
        fn cpus(&self) -> Vec<Cpu> {
            let cpu = Cpu {
                model: "Fixed CPU".to_string(),
                speed: 2400,
                times: CpuTimes { user: 100, nice: 0, sys: 50, idle: 1000, irq: 5 },
            };
            vec![cpu.clone(), cpu]
        }

        fn total_memory(&self) -> u64 {
            16 * 1024 * 1024 * 1024
        }

        fn free_memory(&self) -> u64 {
            4 * 1024 * 1024 * 1024
        }
    }

    fn transcript(input: &str, interactive: bool) -> (Query, String) {
        let mut output = Vec::new();
        let query = ask(input.as_bytes(), &mut output, &Fixed, interactive).unwrap();
        (query, String::from_utf8(output).unwrap())
    }

    #[test]
    fn parse_recognized() {
        assert_eq!(Query::from("cpu"), Query::Cpu);
        assert_eq!(Query::from("totalmem"), Query::TotalMem);
        assert_eq!(Query::from("freemem"), Query::FreeMem);
    }

    #[test]
    fn parse_is_exact() {
        for s in ["CPU", " cpu", "cpu ", "totalMem", "free mem", ""] {
            assert_eq!(Query::from(s), Query::Other(s.to_string()), "{s:?}");
        }
    }

    #[test]
    fn answer_terminators() {
        assert_eq!(read_answer(&mut "cpu\n".as_bytes()).unwrap(), "cpu");
        assert_eq!(read_answer(&mut "cpu\r\n".as_bytes()).unwrap(), "cpu");
        assert_eq!(read_answer(&mut "cpu".as_bytes()).unwrap(), "cpu");
        assert_eq!(read_answer(&mut "  cpu \n".as_bytes()).unwrap(), "  cpu ");
        // Only the first line is consumed.
        assert_eq!(read_answer(&mut "freemem\ncpu\n".as_bytes()).unwrap(), "freemem");
    }

    #[test]
    fn answer_at_end_of_input() {
        assert_eq!(read_answer(&mut "".as_bytes()).unwrap(), "");
    }

    #[test]
    fn answer_invalid_utf8() {
        let mut input: &[u8] = b"cp\xffu\n";
        assert_eq!(read_answer(&mut input).unwrap(), "cp\u{fffd}u");
    }

    #[test]
    fn ask_cpu() {
        let (query, out) = transcript("cpu\n", false);
        assert_eq!(query, Query::Cpu);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], PROMPT);
        assert_eq!(lines[1], "cpu");
        let cpus: Vec<Cpu> = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(cpus, Fixed.cpus());
        assert!(cpus.iter().all(|cpu| !cpu.model.is_empty() && cpu.speed > 0));
    }

    #[test]
    fn ask_memory() {
        let (_, total) = transcript("totalmem\n", false);
        let (_, free) = transcript("freemem\n", false);
        let total: u64 = total.lines().nth(2).unwrap().parse().unwrap();
        let free: u64 = free.lines().nth(2).unwrap().parse().unwrap();
        assert_eq!(total, 17179869184);
        assert_eq!(free, 4294967296);
        assert!(free <= total);
    }

    #[test]
    fn ask_unrecognized() {
        let (query, out) = transcript("xyz\n", false);
        assert_eq!(query, Query::Other("xyz".to_string()));
        assert_eq!(out, format!("{PROMPT}\nxyz\n"));
    }

    #[test]
    fn ask_closed_input() {
        let (query, out) = transcript("", false);
        assert_eq!(query, Query::Other(String::new()));
        assert_eq!(out, format!("{PROMPT}\n\n"));
    }

    #[test]
    fn ask_interactive_prompt_has_no_newline() {
        let (_, out) = transcript("hello\n", true);
        assert_eq!(out, format!("{PROMPT}hello\n"));
    }

    #[test]
    fn ask_same_answer_twice() {
        assert_eq!(transcript("totalmem\n", false), transcript("totalmem\n", false));
    }
}
