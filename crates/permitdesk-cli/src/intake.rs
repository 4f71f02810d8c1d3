//! Line-oriented driver for the intake wizard.

use std::io::{BufRead, Write};

use anyhow::{Context, bail};
use permitdesk_core::{AnswerSink, Prompt, Wizard};

/// Walk `wizard` through every prompt, reading answers from `input`, then
/// deliver the transcript to `sink`.
///
/// Choice prompts accept either the option text or its 1-based number. When
/// delivery fails the user may press Enter to retry or type a replacement for
/// the final answer.
pub async fn run<S, R, W>(wizard: &mut Wizard, sink: &S, mut input: R, mut out: W) -> anyhow::Result<S::Output>
where
    S: AnswerSink,
    R: BufRead,
    W: Write,
{
    wizard.start();
    while wizard.transcript().is_err() {
        let Some(prompt) = wizard.current_prompt().cloned() else {
            bail!("intake wizard has no prompt to show");
        };
        ask(&mut out, &prompt, wizard.cursor() + 1, wizard.prompt_count())?;
        let Some(line) = read_line(&mut input)? else {
            bail!("input ended before the intake was finished");
        };
        let result = match (prompt.options(), line.trim().parse::<usize>()) {
            (Some(options), Ok(n)) if (1..=options.len()).contains(&n) => wizard.select_option(n - 1),
            _ => wizard.record_answer(&line),
        };
        if let Err(e) = result {
            writeln!(out, "  {e}")?;
        }
    }

    loop {
        match wizard.submit(sink).await {
            Ok(output) => return Ok(output),
            Err(e) => {
                writeln!(out, "{e}")?;
                writeln!(out, "Press Enter to retry, or type a new answer to the last question.")?;
                let Some(line) = read_line(&mut input)? else {
                    bail!("submission failed and input ended: {e}");
                };
                if !line.trim().is_empty()
                    && let Err(e) = wizard.record_answer(&line)
                {
                    writeln!(out, "  {e}")?;
                }
            }
        }
    }
}

fn ask(out: &mut impl Write, prompt: &Prompt, number: usize, total: usize) -> anyhow::Result<()> {
    writeln!(out, "[{number}/{total}] {}", prompt.text)?;
    if let Some(options) = prompt.options() {
        for (i, option) in options.iter().enumerate() {
            writeln!(out, "    {}. {option}", i + 1)?;
        }
    }
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

fn read_line(input: &mut impl BufRead) -> anyhow::Result<Option<String>> {
    let mut line = String::new();
    let n = input.read_line(&mut line).context("reading answer")?;
    if n == 0 {
        return Ok(None);
    }
    let len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(len);
    Ok(Some(line))
}
