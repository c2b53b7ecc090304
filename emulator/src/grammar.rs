//! Console command grammar.
//!
//! Lines are parsed with `winnow` straight from the input string into a
//! [`Command`] borrowing client names from the line.

use core::fmt;

use winnow::ascii::{dec_uint, space0, space1};
use winnow::combinator::{alt, dispatch, empty, eof, fail, opt, preceded, terminated};
use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::take_while;

/// Consumer behaviour selected at registration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConsumerKind {
    Touchscreen,
    Hwmon,
}

/// Interrupt line control.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IrqCommand {
    /// Complete every triggered conversion automatically.
    Auto,
    /// Leave conversions pending until `irq fire`.
    Manual,
    /// Raise the line once.
    Fire,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    Register { name: &'a str, kind: ConsumerKind },
    Start {
        name: &'a str,
        channel: u8,
        samples: Option<u32>,
    },
    Read { name: &'a str, channel: u8 },
    Stop { name: &'a str },
    Release { name: &'a str },
    Irq(IrqCommand),
    Status,
    History,
    Suspend,
    Resume,
    Help(Option<&'a str>),
}

/// Position of the first character the grammar could not accept.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GrammarError {
    pub offset: usize,
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected input at column {}", self.offset + 1)
    }
}

/// Parses one console line.
pub fn parse_command(line: &str) -> Result<Command<'_>, GrammarError> {
    terminated(command, (space0, eof))
        .parse(line.trim_start())
        .map_err(|err| GrammarError {
            offset: err.offset(),
        })
}

fn command<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    dispatch! {keyword;
        "register" => (preceded(space1, name), preceded(space1, consumer_kind))
            .map(|(name, kind)| Command::Register { name, kind }),
        "start" => (
            preceded(space1, name),
            preceded(space1, dec_uint),
            opt(preceded(space1, dec_uint)),
        )
            .map(|(name, channel, samples)| Command::Start { name, channel, samples }),
        "read" => (preceded(space1, name), preceded(space1, dec_uint))
            .map(|(name, channel)| Command::Read { name, channel }),
        "stop" => preceded(space1, name).map(|name| Command::Stop { name }),
        "release" => preceded(space1, name).map(|name| Command::Release { name }),
        "irq" => preceded(space1, irq_command).map(Command::Irq),
        "status" => empty.value(Command::Status),
        "history" => empty.value(Command::History),
        "suspend" => empty.value(Command::Suspend),
        "resume" => empty.value(Command::Resume),
        "help" => opt(preceded(space1, name)).map(Command::Help),
        _ => fail,
    }
    .parse_next(input)
}

fn keyword<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_lowercase()).parse_next(input)
}

fn name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .parse_next(input)
}

fn consumer_kind(input: &mut &str) -> ModalResult<ConsumerKind> {
    alt((
        "ts".value(ConsumerKind::Touchscreen),
        "hwmon".value(ConsumerKind::Hwmon),
    ))
    .parse_next(input)
}

fn irq_command(input: &mut &str) -> ModalResult<IrqCommand> {
    alt((
        "auto".value(IrqCommand::Auto),
        "manual".value(IrqCommand::Manual),
        "fire".value(IrqCommand::Fire),
    ))
    .parse_next(input)
}
