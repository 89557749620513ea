/// Wire shapes of bus signals
///
/// Two shapes exist, told apart only by their argument signature:
///
/// | Shape        | Signature | Arguments                              |
/// |--------------|-----------|----------------------------------------|
/// | Command      | `i`       | command code                           |
/// | Notification | `ibs`     | command code, success, info block JSON |
///
/// [`RawSignal`] is the transport-neutral form every bus backend produces
/// and consumes; [`SignalMessage`] is the decoded, typed form.
use super::bus::SignalEndpoint;
use super::commands::CommandCode;
use super::info::NotificationInfo;
use crate::error::DecodeError;

pub const COMMAND_SIGNATURE: &str = "i";
pub const NOTIFICATION_SIGNATURE: &str = "ibs";

/// One signal argument as seen on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum WireArg {
    Int32(i32),
    Bool(bool),
    Str(String),
    /// Any other argument type, kept as its type signature
    Other(String),
}

impl WireArg {
    pub fn signature(&self) -> &str {
        match self {
            WireArg::Int32(_) => "i",
            WireArg::Bool(_) => "b",
            WireArg::Str(_) => "s",
            WireArg::Other(signature) => signature,
        }
    }
}

/// A signal as carried by the bus, before decoding
#[derive(Debug, Clone, PartialEq)]
pub struct RawSignal {
    /// Unique or well-known bus name of the emitter, when known
    pub sender: Option<String>,
    pub path: String,
    pub interface: String,
    pub member: String,
    pub args: Vec<WireArg>,
}

impl RawSignal {
    pub fn new(endpoint: &SignalEndpoint, args: Vec<WireArg>) -> Self {
        Self {
            sender: None,
            path: endpoint.path.clone(),
            interface: endpoint.interface.clone(),
            member: endpoint.member.clone(),
            args,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Concatenated argument signature, e.g. `ibs`
    pub fn signature(&self) -> String {
        self.args.iter().map(WireArg::signature).collect()
    }
}

/// A decoded signal
#[derive(Debug, Clone, PartialEq)]
pub enum SignalMessage<C> {
    Command(C),
    Notification {
        command: C,
        success: bool,
        info: NotificationInfo,
    },
}

impl<C: CommandCode> SignalMessage<C> {
    pub fn notification(command: C, success: bool, info: NotificationInfo) -> Self {
        SignalMessage::Notification {
            command,
            success,
            info,
        }
    }

    pub fn command(&self) -> C {
        match self {
            SignalMessage::Command(command) => *command,
            SignalMessage::Notification { command, .. } => *command,
        }
    }

    /// Info block of a notification; plain commands carry none
    pub fn info(&self) -> Option<&NotificationInfo> {
        match self {
            SignalMessage::Command(_) => None,
            SignalMessage::Notification { info, .. } => Some(info),
        }
    }

    pub fn encode(&self) -> Result<Vec<WireArg>, serde_json::Error> {
        Ok(match self {
            SignalMessage::Command(command) => vec![WireArg::Int32(command.code())],
            SignalMessage::Notification {
                command,
                success,
                info,
            } => vec![
                WireArg::Int32(command.code()),
                WireArg::Bool(*success),
                WireArg::Str(info.encode()?),
            ],
        })
    }

    /// Pick the shape from the argument signature, then decode it.
    pub fn decode(args: &[WireArg]) -> Result<Self, DecodeError> {
        let signature: String = args.iter().map(WireArg::signature).collect();

        match signature.as_str() {
            COMMAND_SIGNATURE => match args {
                [WireArg::Int32(code)] => Ok(SignalMessage::Command(lookup(*code)?)),
                _ => Err(DecodeError::MalformedArguments {
                    signature: signature.clone(),
                }),
            },
            NOTIFICATION_SIGNATURE => match args {
                [WireArg::Int32(code), WireArg::Bool(success), WireArg::Str(raw)] => {
                    let command = lookup(*code)?;
                    let info = NotificationInfo::decode(raw)?;
                    Ok(SignalMessage::Notification {
                        command,
                        success: *success,
                        info,
                    })
                }
                _ => Err(DecodeError::MalformedArguments {
                    signature: signature.clone(),
                }),
            },
            _ => Err(DecodeError::UnexpectedSignature(signature.clone())),
        }
    }

    pub fn description(&self) -> String {
        match self {
            SignalMessage::Command(command) => command.description().to_string(),
            SignalMessage::Notification {
                command, success, ..
            } => format!(
                "{} ({})",
                command.description(),
                if *success { "ok" } else { "failed" }
            ),
        }
    }
}

fn lookup<C: CommandCode>(code: i32) -> Result<C, DecodeError> {
    C::from_code(code).ok_or(DecodeError::UnknownCommand(code))
}
