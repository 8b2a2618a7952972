//! Static MT-SICS command table and the typed builder over it.
//!
//! Each [`CommandKind`] has a wire template with `{}` placeholders, the reply
//! token it expects back and whether that reply is required. [`Catalog`]
//! binds the kinds to the session's timeouts and renders [`Command`]s,
//! rejecting substituted text that would break the line protocol.
use crate::command::Command;
use crate::config::SessionSettings;
use crate::error::CommandError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Heartbeat probe `@`
    Poll,
    /// Idle placeholder; transmits nothing
    Pause,
    WeightImmediate,
    Tare,
    Model,
    ScaleType,
    SerialNumber,
    Firmware,
    WeighMode,
    EnvStability,
    AutoZero,
    StandbyTimeout,
    SetTime,
    SetDate,
    SetDeviceId,
    DisplayText,
    DisplayWeight,
    Beep,
    /// Ad-hoc diagnostic line
    Raw,
}

impl CommandKind {
    pub const ALL: [Self; 19] = [
        Self::Poll,
        Self::Pause,
        Self::WeightImmediate,
        Self::Tare,
        Self::Model,
        Self::ScaleType,
        Self::SerialNumber,
        Self::Firmware,
        Self::WeighMode,
        Self::EnvStability,
        Self::AutoZero,
        Self::StandbyTimeout,
        Self::SetTime,
        Self::SetDate,
        Self::SetDeviceId,
        Self::DisplayText,
        Self::DisplayWeight,
        Self::Beep,
        Self::Raw,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Pause => "pause",
            Self::WeightImmediate => "get_weight_immediate",
            Self::Tare => "get_set_tare",
            Self::Model => "get_model",
            Self::ScaleType => "get_scale_type",
            Self::SerialNumber => "get_serial_number",
            Self::Firmware => "get_firmware",
            Self::WeighMode => "get_set_weigh_mode",
            Self::EnvStability => "get_set_env_stability",
            Self::AutoZero => "get_set_auto_zero",
            Self::StandbyTimeout => "get_set_standby_timeout",
            Self::SetTime => "get_set_time",
            Self::SetDate => "get_set_date",
            Self::SetDeviceId => "get_set_device_id",
            Self::DisplayText => "display_text",
            Self::DisplayWeight => "display_weight",
            Self::Beep => "beep",
            Self::Raw => "raw",
        }
    }

    /// Catalog lookup by name, case-insensitive. `raw` is not a catalog entry.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|k| *k != Self::Raw)
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    pub const fn template(self) -> &'static str {
        match self {
            Self::Poll => "@",
            Self::Pause => "",
            Self::WeightImmediate => "SI",
            Self::Tare => "TA",
            Self::Model => "I11",
            Self::ScaleType => "I2",
            Self::SerialNumber => "I4",
            Self::Firmware => "I3",
            Self::WeighMode => "M01",
            Self::EnvStability => "M02",
            Self::AutoZero => "M03",
            Self::StandbyTimeout => "M16",
            Self::SetTime => "TIM {}",
            Self::SetDate => "DAT {}",
            Self::SetDeviceId => "I10 \"{}\"",
            Self::DisplayText => "D \"{}\"",
            Self::DisplayWeight => "DW",
            Self::Beep => "M12 3",
            Self::Raw => "{}",
        }
    }

    /// Number of `{}` placeholders in the template.
    pub fn arity(self) -> usize {
        self.template().matches("{}").count()
    }

    /// Leading token of the reply this command provokes.
    ///
    /// `SI` answers with `S`, and the `@` heartbeat answers exactly like the
    /// serial-number query `I4`.
    pub const fn reply_token(self) -> Option<&'static str> {
        match self {
            Self::Poll | Self::SerialNumber => Some("I4"),
            Self::WeightImmediate => Some("S"),
            Self::Tare => Some("TA"),
            Self::Model => Some("I11"),
            Self::ScaleType => Some("I2"),
            Self::Firmware => Some("I3"),
            Self::WeighMode => Some("M01"),
            Self::EnvStability => Some("M02"),
            Self::AutoZero => Some("M03"),
            Self::StandbyTimeout => Some("M16"),
            Self::SetTime => Some("TIM"),
            Self::SetDate => Some("DAT"),
            Self::SetDeviceId => Some("I10"),
            Self::DisplayText => Some("D"),
            Self::DisplayWeight => Some("DW"),
            Self::Beep => Some("M12"),
            Self::Pause | Self::Raw => None,
        }
    }

    pub const fn response_required(self) -> bool {
        !matches!(self, Self::Pause | Self::Raw)
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable description of one command; instantiated copies travel the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub kind: CommandKind,
    pub template: &'static str,
    pub timeout: Duration,
    pub response_required: bool,
    pub pause_after_response: Duration,
}

impl CommandDescriptor {
    /// Substitute `args` into the template's placeholders, in order.
    pub fn render(&self, args: &[&str]) -> Result<String, CommandError> {
        let expected = self.kind.arity();
        if args.len() != expected {
            return Err(CommandError::Arity {
                name: self.kind.name(),
                expected,
                got: args.len(),
            });
        }
        let mut out = String::with_capacity(self.template.len() + 16);
        let mut parts = self.template.split("{}");
        if let Some(head) = parts.next() {
            out.push_str(head);
        }
        for (arg, tail) in args.iter().zip(parts) {
            out.push_str(arg);
            out.push_str(tail);
        }
        Ok(out)
    }
}

/// Check text destined for a quoted placeholder.
pub fn check_text(text: &str) -> Result<(), CommandError> {
    if text.is_empty() {
        return Err(CommandError::Empty);
    }
    if let Some(ch) = text.chars().find(|c| *c == '"') {
        return Err(CommandError::ForbiddenChar { ch });
    }
    check_line(text)
}

/// Check a whole line: printable ASCII only, so no CR/LF can split it.
fn check_line(text: &str) -> Result<(), CommandError> {
    match text.chars().find(|c| !c.is_ascii() || c.is_ascii_control()) {
        Some(ch) => Err(CommandError::ForbiddenChar { ch }),
        None => Ok(()),
    }
}

/// Command table bound to one session's timing.
#[derive(Debug, Clone)]
pub struct Catalog {
    cmd_timeout: Duration,
    idle: Duration,
    raw_timeout: Duration,
    beep_pause: Duration,
    device_id: String,
}

impl Catalog {
    pub fn new(settings: &SessionSettings) -> Self {
        Self {
            cmd_timeout: settings.cmd_timeout,
            idle: settings.idle,
            raw_timeout: settings.raw_timeout,
            beep_pause: settings.beep_pause,
            device_id: settings.device_id.clone(),
        }
    }

    pub fn descriptor(&self, kind: CommandKind) -> CommandDescriptor {
        let timeout = match kind {
            CommandKind::Pause => self.idle,
            CommandKind::Raw => self.raw_timeout,
            _ => self.cmd_timeout,
        };
        let pause_after_response = match kind {
            CommandKind::Beep => self.beep_pause,
            _ => Duration::ZERO,
        };
        CommandDescriptor {
            kind,
            template: kind.template(),
            timeout,
            response_required: kind.response_required(),
            pause_after_response,
        }
    }

    fn build(&self, kind: CommandKind, args: &[&str]) -> Result<Command, CommandError> {
        let descriptor = self.descriptor(kind);
        let line = descriptor.render(args)?;
        Ok(Command::new(descriptor, line))
    }

    /// The idle placeholder with its default wait.
    pub fn idle(&self) -> Command {
        Command::new(self.descriptor(CommandKind::Pause), String::new())
    }

    /// A command whose template has no placeholders.
    pub fn fixed(&self, kind: CommandKind) -> Result<Command, CommandError> {
        if kind.arity() != 0 {
            return Err(CommandError::NotInstantiable(kind.name()));
        }
        self.build(kind, &[])
    }

    pub fn set_time(&self, t: NaiveTime) -> Command {
        let descriptor = self.descriptor(CommandKind::SetTime);
        let line = format!("TIM {}", t.format("%H %M %S"));
        Command::new(descriptor, line)
    }

    pub fn set_date(&self, d: NaiveDate) -> Command {
        let descriptor = self.descriptor(CommandKind::SetDate);
        let line = format!("DAT {}", d.format("%d %m %Y"));
        Command::new(descriptor, line)
    }

    pub fn set_device_id(&self, tag: &str) -> Result<Command, CommandError> {
        check_text(tag)?;
        self.build(CommandKind::SetDeviceId, &[tag])
    }

    pub fn display_text(&self, text: &str) -> Result<Command, CommandError> {
        check_text(text)?;
        self.build(CommandKind::DisplayText, &[text])
    }

    /// Ad-hoc line; quotes are allowed, control and non-ASCII characters are not.
    pub fn raw(&self, text: &str) -> Result<Command, CommandError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommandError::Empty);
        }
        check_line(text)?;
        self.build(CommandKind::Raw, &[text])
    }

    /// Instantiate a catalog entry by name. Time, date and device tag are
    /// filled from `now` and the configured id; `display_text` needs caller
    /// text and is refused.
    pub fn by_name(&self, name: &str, now: NaiveDateTime) -> Option<Result<Command, CommandError>> {
        let kind = CommandKind::from_name(name.trim())?;
        Some(match kind {
            CommandKind::SetTime => Ok(self.set_time(now.time())),
            CommandKind::SetDate => Ok(self.set_date(now.date())),
            CommandKind::SetDeviceId => self.set_device_id(&self.device_id),
            other => self.fixed(other),
        })
    }

    /// Commands sent on entering `Initializing`: identity, configuration,
    /// clock, tag, a beep, then tare and weight.
    pub fn init_sequence(&self, now: NaiveDateTime) -> Result<Vec<Command>, CommandError> {
        let mut seq = Vec::with_capacity(14);
        for kind in [
            CommandKind::Model,
            CommandKind::ScaleType,
            CommandKind::SerialNumber,
            CommandKind::Firmware,
            CommandKind::WeighMode,
            CommandKind::EnvStability,
            CommandKind::AutoZero,
            CommandKind::StandbyTimeout,
        ] {
            seq.push(self.fixed(kind)?);
        }
        seq.push(self.set_time(now.time()));
        seq.push(self.set_date(now.date()));
        seq.push(self.set_device_id(&self.device_id)?);
        seq.push(self.fixed(CommandKind::Beep)?);
        seq.push(self.fixed(CommandKind::Tare)?);
        seq.push(self.fixed(CommandKind::WeightImmediate)?);
        Ok(seq)
    }
}
