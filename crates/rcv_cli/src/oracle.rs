//! Console tie oracle: lists the tied candidates and reads a choice per line.

use std::io::{BufRead, Write};

use rcv_algo::{Cancelled, TieBreakOracle};
use rcv_core::CandidateId;

/// Accepts a 1-based number or a candidate name. An empty line, `cancel`,
/// or end of input cancels the run. Anything else re-prompts.
pub struct ConsoleOracle<R, W> {
    input: R,
    prompt: W,
}

impl<R: BufRead, W: Write> ConsoleOracle<R, W> {
    pub fn new(input: R, prompt: W) -> Self {
        Self { input, prompt }
    }

    fn ask(&mut self, tied: &[CandidateId], selecting_winner: bool) -> std::io::Result<Option<CandidateId>> {
        let what = if selecting_winner { "winner" } else { "candidate to eliminate" };
        writeln!(self.prompt, "Tie: choose the {what}")?;
        for (i, c) in tied.iter().enumerate() {
            writeln!(self.prompt, "  {}) {}", i + 1, c)?;
        }
        loop {
            write!(self.prompt, "> ")?;
            self.prompt.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let answer = line.trim();
            if answer.is_empty() || answer.eq_ignore_ascii_case("cancel") {
                return Ok(None);
            }
            if let Ok(n) = answer.parse::<usize>() {
                if (1..=tied.len()).contains(&n) {
                    return Ok(Some(tied[n - 1].clone()));
                }
            }
            if let Some(c) = tied.iter().find(|c| c.as_str() == answer) {
                return Ok(Some(c.clone()));
            }
            writeln!(self.prompt, "not one of the tied candidates: {answer}")?;
        }
    }
}

impl<R: BufRead, W: Write> TieBreakOracle for ConsoleOracle<R, W> {
    fn resolve(&mut self, tied: &[CandidateId], selecting_winner: bool) -> Result<CandidateId, Cancelled> {
        match self.ask(tied, selecting_winner) {
            Ok(Some(choice)) => Ok(choice),
            Ok(None) | Err(_) => Err(Cancelled),
        }
    }
}
