use std::collections::BTreeMap;
use std::io;

use adc_core::consumers::{Consumer, Hwmon, Touchscreen};
use adc_core::history::EventRecord;
use adc_core::{AdcConfig, AdcError, Client, Completion, Device, HostPlatform, Revision};
use embassy_futures::block_on;
use static_cell::StaticCell;

use crate::grammar::{self, Command, ConsumerKind, IrqCommand};
use crate::irq_line::IrqLine;

pub type AdcDevice = Device<HostPlatform, Consumer>;

static DEVICE: StaticCell<AdcDevice> = StaticCell::new();

/// Reference voltage the emulated monitor channels are scaled against.
const REFERENCE_MV: u32 = 3300;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "register",
        "register <name> <ts|hwmon>     - register a touchscreen or hwmon client",
    ),
    (
        "start",
        "start <name> <channel> [n]     - queue a burst of n conversions (default: consumer burst)",
    ),
    (
        "read",
        "read <name> <channel>          - convert one sample and wait for it",
    ),
    (
        "stop",
        "stop <name>                    - withdraw a pending or active request",
    ),
    (
        "release",
        "release <name>                 - unregister a client",
    ),
    (
        "irq",
        "irq <auto|manual|fire>         - control the simulated interrupt line",
    ),
    (
        "status",
        "status                         - display arbiter state",
    ),
    (
        "history",
        "history                        - list recorded scheduling events",
    ),
    (
        "suspend",
        "suspend                        - park the converter and gate its clock",
    ),
    (
        "resume",
        "resume                         - restore converter power",
    ),
    (
        "help",
        "help [topic]                   - show help for a command",
    ),
];

pub struct Session {
    device: &'static AdcDevice,
    irq: IrqLine,
    clients: BTreeMap<String, Client>,
}

impl Session {
    /// Probes the emulated converter. Only one session can exist per process.
    pub fn new(revision: Revision) -> io::Result<Self> {
        let device = Device::probe(HostPlatform::new(), AdcConfig::new(revision))
            .map_err(|err| io::Error::other(format!("probe failed: {err}")))?;
        let device: &'static AdcDevice = DEVICE
            .try_init(device)
            .ok_or_else(|| io::Error::other("converter already probed"))?;

        Ok(Self {
            device,
            irq: IrqLine::spawn(device),
            clients: BTreeMap::new(),
        })
    }

    pub fn revision(&self) -> Revision {
        self.device.config().revision
    }

    pub fn handle_command(&mut self, line: &str) -> Vec<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        match grammar::parse_command(trimmed) {
            Ok(command) => self.execute(command),
            Err(err) => vec![format!("ERR syntax {err}")],
        }
    }

    fn execute(&mut self, command: Command<'_>) -> Vec<String> {
        match command {
            Command::Register { name, kind } => self.handle_register(name, kind),
            Command::Start {
                name,
                channel,
                samples,
            } => self.handle_start(name, channel, samples),
            Command::Read { name, channel } => self.handle_read(name, channel),
            Command::Stop { name } => self.with_client(name, |session, client| {
                session.device.stop(client);
                vec![format!("OK {name} stopped")]
            }),
            Command::Release { name } => self.handle_release(name),
            Command::Irq(irq) => self.handle_irq(irq),
            Command::Status => self.handle_status(),
            Command::History => self.handle_history(),
            Command::Suspend => {
                self.device.suspend();
                vec!["OK suspended".to_string()]
            }
            Command::Resume => {
                self.device.resume();
                vec!["OK resumed".to_string()]
            }
            Command::Help(topic) => handle_help(topic),
        }
    }

    fn handle_register(&mut self, name: &str, kind: ConsumerKind) -> Vec<String> {
        if self.clients.contains_key(name) {
            return vec![format!("ERR {name} is already registered")];
        }

        let consumer = match kind {
            ConsumerKind::Touchscreen => Consumer::from(Touchscreen::default()),
            ConsumerKind::Hwmon => Consumer::from(Hwmon::new()),
        };
        let label = consumer.kind();
        let role = consumer.role();
        // Owner names live as long as the device.
        let owner: &'static str = Box::leak(name.to_owned().into_boxed_str());

        match self.device.register(owner, consumer, role) {
            Ok(client) => {
                let line = format!("OK registered {name} as {} ({label})", client.id());
                self.clients.insert(name.to_owned(), client);
                vec![line]
            }
            Err(err) => vec![describe_error(name, err)],
        }
    }

    fn handle_start(&mut self, name: &str, channel: u8, samples: Option<u32>) -> Vec<String> {
        self.with_client(name, |session, client| {
            let samples = samples
                .or_else(|| session.device.with_handler(client, default_burst))
                .unwrap_or(1);
            match session
                .device
                .start(client, channel, samples, Completion::Callback)
            {
                Ok(()) => vec![format!(
                    "OK {name} started ch={channel} samples={samples}"
                )],
                Err(err) => vec![describe_error(name, err)],
            }
        })
    }

    fn handle_read(&mut self, name: &str, channel: u8) -> Vec<String> {
        let timeout = self.device.config().read_timeout;
        self.with_client(name, |session, client| {
            match block_on(session.device.read(client, channel)) {
                Ok(value) => vec![format!("OK {name} ch={channel} value=0x{value:03x}")],
                Err(AdcError::Timeout) => vec![
                    describe_error(name, AdcError::Timeout),
                    format!(
                        "no conversion completed within {}ms (errors in a row: {})",
                        timeout.as_millis(),
                        session.device.error_count(client)
                    ),
                ],
                Err(err) => vec![describe_error(name, err)],
            }
        })
    }

    fn handle_release(&mut self, name: &str) -> Vec<String> {
        let Some(client) = self.clients.remove(name) else {
            return vec![format!("ERR unknown client {name}")];
        };

        let revision = self.revision();
        let mut lines = vec![format!("OK {name} released")];
        if let Some(mut consumer) = self.device.release(client) {
            lines.extend(describe_consumer(&mut consumer, revision));
        }
        lines
    }

    fn handle_irq(&mut self, irq: IrqCommand) -> Vec<String> {
        match irq {
            IrqCommand::Auto => {
                self.irq.set_auto(true);
                vec!["OK irq auto".to_string()]
            }
            IrqCommand::Manual => {
                self.irq.set_auto(false);
                vec!["OK irq manual".to_string()]
            }
            IrqCommand::Fire => match self.irq.fire() {
                Some(sample) => vec![format!(
                    "OK irq fired ch={} d0=0x{:03x} d1=0x{:03x}",
                    sample.channel, sample.data0, sample.data1
                )],
                None => vec!["OK irq fired (no conversion pending)".to_string()],
            },
        }
    }

    fn handle_status(&mut self) -> Vec<String> {
        let status = self.device.status();
        let revision = self.revision();
        let mode = if self.irq.is_auto() { "auto" } else { "manual" };

        let mut lines = vec![
            format!("{} {status}", revision.device_id()),
            format!("irq {mode} outstanding={}", self.irq.outstanding()),
        ];
        for (name, client) in &self.clients {
            let mut line = format!(
                "  {name} {} claimed={} running={} errors={}",
                client.id(),
                self.device.is_claimed(client),
                self.device.is_running(client),
                self.device.error_count(client)
            );
            if let Some(detail) = self
                .device
                .with_handler(client, |consumer| summarize_consumer(consumer, revision))
            {
                line.push(' ');
                line.push_str(&detail);
            }
            lines.push(line);
        }
        lines
    }

    fn handle_history(&mut self) -> Vec<String> {
        let records: Vec<EventRecord> = self
            .device
            .with_history(|history| history.oldest_first().copied().collect());
        if records.is_empty() {
            return vec!["history empty".to_string()];
        }
        records
            .iter()
            .map(|record| format!("#{:<4} {}", record.id, record.event))
            .collect()
    }

    fn with_client<F>(&mut self, name: &str, f: F) -> Vec<String>
    where
        F: FnOnce(&Self, &Client) -> Vec<String>,
    {
        match self.clients.get(name) {
            Some(client) => f(self, client),
            None => vec![format!("ERR unknown client {name}")],
        }
    }
}

fn handle_help(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_error(name: &str, err: AdcError) -> String {
    let code = match err {
        AdcError::Busy => "busy",
        AdcError::Timeout => "timeout",
        AdcError::InvalidArgument => "invalid",
        AdcError::NoMemory => "no-memory",
        AdcError::ResourceUnavailable(_) => "unavailable",
    };
    if err.is_recoverable() {
        format!("ERR {code} {name}: {err}, retry later")
    } else {
        format!("ERR {code} {name}: {err}")
    }
}

/// Burst length a consumer asks for when the console gives none.
fn default_burst(consumer: &mut Consumer) -> u32 {
    consumer
        .as_touchscreen_mut()
        .map_or(1, |ts| ts.samples_per_point())
}

fn summarize_consumer(consumer: &mut Consumer, revision: Revision) -> String {
    match consumer {
        Consumer::Touchscreen(ts) => format!(
            "ts samples/point={} converting={}",
            ts.samples_per_point(),
            ts.is_converting()
        ),
        Consumer::Hwmon(hwmon) => match hwmon.latest() {
            Some(value) => format!(
                "hwmon latest=0x{value:03x} ({}mV) readings={}",
                Hwmon::millivolts(value, REFERENCE_MV, revision),
                hwmon.readings()
            ),
            None => format!("hwmon readings={}", hwmon.readings()),
        },
    }
}

fn describe_consumer(consumer: &mut Consumer, revision: Revision) -> Vec<String> {
    let mut lines = vec![summarize_consumer(consumer, revision)];
    if let Some(point) = consumer
        .as_touchscreen_mut()
        .and_then(Touchscreen::take_point)
    {
        lines.push(format!("last touch x={} y={}", point.x, point.y));
    }
    lines
}
