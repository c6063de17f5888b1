use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use serde::Serialize;

use crate::bank::{MotorBank, MotorId};
use crate::config::DeviceConfig;
use crate::stepper::{Direction, Motor};
use crate::{Error, Result};

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";

/// A motor request decoded from a GET path and query string.
///
/// Durations keep the requested value as parsed; `None` means the request carried none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start {
        motor: MotorId,
        direction: Direction,
        duration: Option<i32>,
    },
    Stop(MotorId),
    StartBoth {
        first: Direction,
        second: Direction,
        duration: Option<i32>,
    },
    StopAll,
    SetSpeed(String),
    Status,
    Reboot,
}

impl Command {
    /// Returns `None` for paths outside the route table.
    pub fn parse(path: &str, query: Option<&str>) -> Option<Self> {
        let rest = path.strip_prefix('/')?;
        let (head, tail) = match rest.split_once('/') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };

        match head {
            "motor1" => Self::parse_motor(MotorId::One, tail, query),
            "motor2" => Self::parse_motor(MotorId::Two, tail, query),
            "both" => Self::parse_both(tail, query),
            "stop" if tail == Some("all") => Some(Command::StopAll),
            "set" => tail?
                .strip_prefix("speed/")
                .map(|raw| Command::SetSpeed(raw.to_owned())),
            "status" if tail.is_none() => Some(Command::Status),
            "reboot" if tail.is_none() => Some(Command::Reboot),
            _ => None,
        }
    }

    fn parse_motor(motor: MotorId, tail: Option<&str>, query: Option<&str>) -> Option<Self> {
        let tail = tail?;
        let (action, arg) = match tail.split_once('/') {
            Some((action, arg)) => (action, Some(arg)),
            None => (tail, None),
        };

        let direction = match action {
            "stop" if arg.is_none() => return Some(Command::Stop(motor)),
            "cw" => Direction::Clockwise,
            "ccw" => Direction::CounterClockwise,
            _ => return None,
        };

        let duration = match arg {
            Some(arg) => Some(parse_int(arg)),
            None => query_param(query, "t").map(|t| parse_int(&t)),
        };

        Some(Command::Start {
            motor,
            direction,
            duration,
        })
    }

    fn parse_both(tail: Option<&str>, query: Option<&str>) -> Option<Self> {
        match tail {
            Some(tail) => {
                let parts: Vec<&str> = tail.splitn(3, '/').collect();
                match parts.as_slice() {
                    [first, second, duration] => Some(Command::StartBoth {
                        first: Direction::from_token(first),
                        second: Direction::from_token(second),
                        duration: Some(parse_int(duration)),
                    }),
                    _ => None,
                }
            }
            None => {
                let first = query_param(query, "d1");
                let second = query_param(query, "d2");
                Some(Command::StartBoth {
                    first: Direction::from_token(first.as_deref().unwrap_or("cw")),
                    second: Direction::from_token(second.as_deref().unwrap_or("cw")),
                    duration: query_param(query, "t").map(|t| parse_int(&t)),
                })
            }
        }
    }
}

/// Lenient integer coercion: leading whitespace, optional sign, then digits up to the
/// first non-digit. No digits yields 0; out-of-range values saturate.
pub fn parse_int(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let limit = i64::from(i32::MAX) + 1;
    let mut value: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(byte - b'0')).min(limit);
    }

    let value = if negative { -value } else { value };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// First value for `key` in an `a=1&b=2` query, percent-decoded.
pub fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| match pair.split_once('=') {
            Some((k, v)) => Some((k, v)),
            None if !pair.is_empty() => Some((pair, "")),
            None => None,
        })
        .find(|(k, _)| percent_decode(k) == key)
        .map(|(_, v)| percent_decode(v))
}

fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        decoded.push(hi << 4 | lo);
                        i += 2;
                    }
                    _ => decoded.push(b'%'),
                }
            }
            byte => decoded.push(byte),
        }
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// The transport restarts the device once `delay_ms` has passed after replying.
    Reboot { delay_ms: u64 },
}

/// Always sent with status 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content_type: &'static str,
    pub body: String,
    pub effect: Option<Effect>,
}

impl Reply {
    pub fn text(body: String) -> Self {
        Self {
            content_type: TEXT_PLAIN,
            body,
            effect: None,
        }
    }

    pub fn json(body: String) -> Self {
        Self {
            content_type: APPLICATION_JSON,
            body,
            effect: None,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub motor1: &'static str,
    pub motor2: &'static str,
}

impl StatusReport {
    pub fn capture<M: Motor>(bank: &MotorBank<M>) -> Self {
        Self {
            motor1: bank.status(MotorId::One).label(),
            motor2: bank.status(MotorId::Two).label(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|_| Error::SerializationError)
    }
}

/// Applies one command to the bank and builds the acknowledgement.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    default_duration_secs: u32,
    reboot_delay_ms: u64,
}

impl Dispatcher {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            default_duration_secs: config.default_duration_secs,
            reboot_delay_ms: config.reboot_delay_ms,
        }
    }

    /// Requested durations of zero, below zero, or absent fall back to the default.
    pub fn effective_duration(&self, requested: Option<i32>) -> u32 {
        match requested {
            Some(secs) if secs > 0 => secs as u32,
            _ => self.default_duration_secs,
        }
    }

    pub fn dispatch<M: Motor>(
        &self,
        bank: &mut MotorBank<M>,
        path: &str,
        query: Option<&str>,
        now_ms: u64,
    ) -> Option<Reply> {
        Command::parse(path, query).map(|command| self.handle(bank, &command, now_ms))
    }

    pub fn handle<M: Motor>(&self, bank: &mut MotorBank<M>, command: &Command, now_ms: u64) -> Reply {
        match command {
            Command::Start {
                motor,
                direction,
                duration,
            } => {
                let secs = self.effective_duration(*duration);
                log::info!(
                    "[HTTP] /motor{}/{} requested={:?} (effective: {}s)",
                    motor.index(),
                    direction.token(),
                    duration,
                    secs
                );
                bank.start_motor(*motor, *direction, secs, now_ms);
                Reply::text(format!(
                    "电机{}{}转动{}秒",
                    motor.index(),
                    direction.label(),
                    secs
                ))
            }
            Command::Stop(motor) => {
                log::info!("[HTTP] /motor{}/stop", motor.index());
                bank.stop_motor(*motor);
                Reply::text(format!("电机{}已停止", motor.index()))
            }
            Command::StartBoth {
                first,
                second,
                duration,
            } => {
                let secs = self.effective_duration(*duration);
                log::info!(
                    "[HTTP] /both/{}/{} requested={:?} (effective: {}s)",
                    first.token(),
                    second.token(),
                    duration,
                    secs
                );
                bank.start_motor(MotorId::One, *first, secs, now_ms);
                bank.start_motor(MotorId::Two, *second, secs, now_ms);
                Reply::text(format!("双电机已启动运行{}秒", secs))
            }
            Command::StopAll => {
                log::info!("[HTTP] /stop/all");
                bank.stop_all();
                Reply::text("所有电机已停止".into())
            }
            Command::SetSpeed(raw) => {
                let interval_us = parse_int(raw).max(0) as u32;
                log::info!("[HTTP] /set/speed/{}", interval_us);
                bank.set_step_interval(interval_us);
                Reply::text(format!("速度已设置为: {}", raw))
            }
            Command::Status => {
                let body = StatusReport::capture(bank).to_json().unwrap_or_default();
                Reply::json(body)
            }
            Command::Reboot => {
                log::info!("[HTTP] /reboot in {}ms", self.reboot_delay_ms);
                Reply::text(format!("系统将在{}秒后重启...", self.reboot_delay_ms / 1000))
                    .with_effect(Effect::Reboot {
                        delay_ms: self.reboot_delay_ms,
                    })
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(&DeviceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::MotorStatus;
    use crate::mock::{Trace, delays, mock_bank};

    #[test]
    fn test_parse_motor_routes() {
        assert_eq!(
            Command::parse("/motor1/cw/7", None),
            Some(Command::Start {
                motor: MotorId::One,
                direction: Direction::Clockwise,
                duration: Some(7),
            })
        );
        assert_eq!(
            Command::parse("/motor2/ccw", Some("t=3")),
            Some(Command::Start {
                motor: MotorId::Two,
                direction: Direction::CounterClockwise,
                duration: Some(3),
            })
        );
        assert_eq!(
            Command::parse("/motor2/cw", None),
            Some(Command::Start {
                motor: MotorId::Two,
                direction: Direction::Clockwise,
                duration: None,
            })
        );
        assert_eq!(
            Command::parse("/motor1/stop", None),
            Some(Command::Stop(MotorId::One))
        );
        assert_eq!(Command::parse("/motor3/cw/5", None), None);
        assert_eq!(Command::parse("/motor1/spin/5", None), None);
        assert_eq!(Command::parse("/motor1", None), None);
    }

    #[test]
    fn test_path_argument_wins_over_query() {
        assert_eq!(
            Command::parse("/motor1/ccw/9", Some("t=2")),
            Some(Command::Start {
                motor: MotorId::One,
                direction: Direction::CounterClockwise,
                duration: Some(9),
            })
        );
    }

    #[test]
    fn test_parse_both_routes() {
        assert_eq!(
            Command::parse("/both/ccw/cw/3", None),
            Some(Command::StartBoth {
                first: Direction::CounterClockwise,
                second: Direction::Clockwise,
                duration: Some(3),
            })
        );
        assert_eq!(
            Command::parse("/both/left/cw/", None),
            Some(Command::StartBoth {
                first: Direction::CounterClockwise,
                second: Direction::Clockwise,
                duration: Some(0),
            })
        );
        assert_eq!(
            Command::parse("/both", Some("d2=ccw")),
            Some(Command::StartBoth {
                first: Direction::Clockwise,
                second: Direction::CounterClockwise,
                duration: None,
            })
        );
        assert_eq!(Command::parse("/both/cw/ccw", None), None);
    }

    #[test]
    fn test_parse_misc_routes() {
        assert_eq!(Command::parse("/stop/all", None), Some(Command::StopAll));
        assert_eq!(
            Command::parse("/set/speed/500", None),
            Some(Command::SetSpeed("500".into()))
        );
        assert_eq!(Command::parse("/set/speed", None), None);
        assert_eq!(Command::parse("/status", None), Some(Command::Status));
        assert_eq!(Command::parse("/reboot", None), Some(Command::Reboot));
        assert_eq!(Command::parse("/", None), None);
        assert_eq!(Command::parse("/stop", None), None);
        assert_eq!(Command::parse("status", None), None);
    }

    #[test]
    fn test_parse_int_is_lenient() {
        assert_eq!(parse_int("42"), 42);
        assert_eq!(parse_int("  12abc"), 12);
        assert_eq!(parse_int("-8"), -8);
        assert_eq!(parse_int("+3"), 3);
        assert_eq!(parse_int("abc"), 0);
        assert_eq!(parse_int(""), 0);
        assert_eq!(parse_int("99999999999"), i32::MAX);
        assert_eq!(parse_int("-99999999999"), i32::MIN);
    }

    #[test]
    fn test_query_param_decoding() {
        assert_eq!(query_param(Some("t=5&d1=ccw"), "d1"), Some("ccw".into()));
        assert_eq!(query_param(Some("a=%31%32&b"), "a"), Some("12".into()));
        assert_eq!(query_param(Some("msg=a+b%"), "msg"), Some("a b%".into()));
        assert_eq!(query_param(Some("flag"), "flag"), Some(String::new()));
        assert_eq!(query_param(Some("t=1&t=2"), "t"), Some("1".into()));
        assert_eq!(query_param(None, "t"), None);
        assert_eq!(query_param(Some(""), "t"), None);
    }

    #[test]
    fn test_start_defaults_to_five_seconds() {
        let trace = Trace::default();
        let mut bank = mock_bank(&trace);
        let dispatcher = Dispatcher::default();

        for (path, query) in [
            ("/motor1/cw/0", None),
            ("/motor1/cw/-4", None),
            ("/motor1/cw/", None),
            ("/motor1/cw", None),
            ("/motor1/cw", Some("t=abc")),
        ] {
            let reply = dispatcher.dispatch(&mut bank, path, query, 1000).unwrap();
            assert_eq!(reply.body, "电机1顺时针转动5秒");
            assert_eq!(reply.content_type, TEXT_PLAIN);
            assert_eq!(bank.state(MotorId::One).stop_deadline, 6000);
        }
    }

    #[test]
    fn test_start_and_stop_replies() {
        let trace = Trace::default();
        let mut bank = mock_bank(&trace);
        let dispatcher = Dispatcher::default();

        let reply = dispatcher
            .dispatch(&mut bank, "/motor2/ccw/12", None, 0)
            .unwrap();
        assert_eq!(reply.body, "电机2逆时针转动12秒");
        assert_eq!(
            bank.status(MotorId::Two),
            MotorStatus::Running(Direction::CounterClockwise)
        );

        let reply = dispatcher.dispatch(&mut bank, "/motor2/stop", None, 10).unwrap();
        assert_eq!(reply.body, "电机2已停止");
        assert_eq!(bank.status(MotorId::Two), MotorStatus::Stopped);
    }

    #[test]
    fn test_both_then_stop_all() {
        let trace = Trace::default();
        let mut bank = mock_bank(&trace);
        let dispatcher = Dispatcher::default();

        let reply = dispatcher.dispatch(&mut bank, "/both/ccw/cw/3", None, 0).unwrap();
        assert_eq!(reply.body, "双电机已启动运行3秒");
        assert_eq!(
            bank.status(MotorId::One),
            MotorStatus::Running(Direction::CounterClockwise)
        );
        assert_eq!(
            bank.status(MotorId::Two),
            MotorStatus::Running(Direction::Clockwise)
        );
        assert_eq!(bank.state(MotorId::One).stop_deadline, 3000);
        assert_eq!(bank.state(MotorId::Two).stop_deadline, 3000);

        let reply = dispatcher.dispatch(&mut bank, "/stop/all", None, 1).unwrap();
        assert_eq!(reply.body, "所有电机已停止");
        assert_eq!(bank.status(MotorId::One), MotorStatus::Stopped);
        assert_eq!(bank.status(MotorId::Two), MotorStatus::Stopped);
    }

    #[test]
    fn test_set_speed_drives_pulse_width() {
        let trace = Trace::default();
        let mut bank = mock_bank(&trace);
        let dispatcher = Dispatcher::default();

        let reply = dispatcher.dispatch(&mut bank, "/set/speed/500", None, 0).unwrap();
        assert_eq!(reply.body, "速度已设置为: 500");
        dispatcher.dispatch(&mut bank, "/motor1/cw/1", None, 0);
        trace.borrow_mut().clear();

        bank.poll(10);

        assert_eq!(delays(&trace), vec![500, 500]);
    }

    #[test]
    fn test_set_speed_echoes_raw_text() {
        let trace = Trace::default();
        let mut bank = mock_bank(&trace);
        let dispatcher = Dispatcher::default();

        let reply = dispatcher.dispatch(&mut bank, "/set/speed/fast", None, 0).unwrap();
        assert_eq!(reply.body, "速度已设置为: fast");
        assert_eq!(bank.step_interval(), 0);

        dispatcher.dispatch(&mut bank, "/set/speed/-20", None, 0);
        assert_eq!(bank.step_interval(), 0);
    }

    #[test]
    fn test_status_document() {
        let trace = Trace::default();
        let mut bank = mock_bank(&trace);
        let dispatcher = Dispatcher::default();

        let reply = dispatcher.dispatch(&mut bank, "/status", None, 0).unwrap();
        assert_eq!(reply.content_type, APPLICATION_JSON);
        assert_eq!(reply.body, r#"{"motor1":"停止","motor2":"停止"}"#);

        dispatcher.dispatch(&mut bank, "/motor1/cw/2", None, 0);
        dispatcher.dispatch(&mut bank, "/motor2/ccw/2", None, 0);
        let reply = dispatcher.dispatch(&mut bank, "/status", None, 0).unwrap();
        assert_eq!(reply.body, r#"{"motor1":"顺时针","motor2":"逆时针"}"#);

        bank.poll(2000);
        let reply = dispatcher.dispatch(&mut bank, "/status", None, 2000).unwrap();
        assert_eq!(reply.body, r#"{"motor1":"停止","motor2":"停止"}"#);
    }

    #[test]
    fn test_reboot_carries_effect() {
        let trace = Trace::default();
        let mut bank = mock_bank(&trace);
        let dispatcher = Dispatcher::default();

        let reply = dispatcher.dispatch(&mut bank, "/reboot", None, 0).unwrap();

        assert_eq!(reply.body, "系统将在3秒后重启...");
        assert_eq!(reply.effect, Some(Effect::Reboot { delay_ms: 3000 }));
    }

    #[test]
    fn test_unknown_route_is_not_dispatched() {
        let trace = Trace::default();
        let mut bank = mock_bank(&trace);
        let dispatcher = Dispatcher::default();

        assert!(dispatcher.dispatch(&mut bank, "/motor9/cw/1", None, 0).is_none());
        assert!(dispatcher.dispatch(&mut bank, "/index.html", None, 0).is_none());
    }
}
