mod grammar;
mod irq_line;
mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use adc_core::Revision;
use session::Session;

fn main() -> io::Result<()> {
    let revision = parse_revision().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!(
            "Usage: adc-emulator [--revision <s3c24xx-adc|s3c64xx-adc|samsung-adc-v3|samsung-adc-v4>]"
        );
        process::exit(2);
    });

    let mut session = Session::new(revision)?;
    run_console(&mut session, io::stdin().lock(), io::stdout().lock())
}

/// Feeds console lines to the session until `quit`/`exit` or end of input.
fn run_console(
    session: &mut Session,
    input: impl BufRead,
    mut output: impl Write,
) -> io::Result<()> {
    writeln!(
        output,
        "{} converter online. `help` lists commands, `quit` leaves.",
        session.revision().device_id()
    )?;
    prompt(&mut output)?;

    for line in input.lines() {
        let line = line?;
        let command = line.trim();
        if matches!(command, "quit" | "exit") {
            return writeln!(output, "bye");
        }
        for reply in session.handle_command(command) {
            writeln!(output, "{reply}")?;
        }
        prompt(&mut output)?;
    }

    writeln!(output)
}

fn prompt(output: &mut impl Write) -> io::Result<()> {
    write!(output, "adc> ")?;
    output.flush()
}

fn parse_revision() -> Result<Revision, String> {
    let mut args = env::args().skip(1);
    let tag = match args.next() {
        None => return Ok(Revision::V2),
        Some(arg) => {
            if let Some(value) = arg.strip_prefix("--revision=") {
                value.to_string()
            } else if arg == "--revision" {
                args.next()
                    .ok_or_else(|| "Expected value after --revision".to_string())?
            } else {
                arg
            }
        }
    };

    Revision::from_device_id(&tag).ok_or_else(|| format!("Unknown converter revision `{tag}`"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn console_stops_at_quit() {
        let mut session = Session::new(Revision::V2).expect("first session in this process");
        let input = Cursor::new("\nregister vbat hwmon\nquit\nstatus\n");
        let mut output = Vec::new();

        run_console(&mut session, input, &mut output).expect("in-memory io");

        let text = String::from_utf8(output).expect("utf-8 output");
        assert!(text.starts_with("s3c64xx-adc converter online."));
        assert!(text.contains("OK registered vbat as"));
        assert!(text.ends_with("bye\n"));
        assert!(!text.contains("irq auto"), "nothing after quit runs");
    }
}
