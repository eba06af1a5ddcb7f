//! Host-side events relayed out to the helmet display.
//!
//! Call and notification listeners run outside this process; they deliver
//! events as single lines over the intake socket (see
//! `infrastructure::intake`). Each event renders to exactly one link
//! message.

/// An event observed on the host that the helmet should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    IncomingCall {
        number: Option<String>,
    },
    CallAnswered,
    CallEnded,
    Navigation {
        instruction: String,
    },
    Notification {
        app: String,
        title: Option<String>,
        body: String,
    },
}

impl HostEvent {
    /// Parse one intake line.
    ///
    /// Line format: `call:ringing[:number]`, `call:answered`, `call:ended`,
    /// `nav:<instruction>`, `notify:<app>:<title>:<body>` (empty title
    /// allowed). Malformed lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("call:") {
            let mut parts = rest.splitn(2, ':');
            return match parts.next()?.trim() {
                "ringing" => Some(Self::IncomingCall {
                    number: parts
                        .next()
                        .map(|n| n.trim().to_string())
                        .filter(|n| !n.is_empty()),
                }),
                "answered" => Some(Self::CallAnswered),
                "ended" => Some(Self::CallEnded),
                _ => None,
            };
        }
        if let Some(instruction) = line.strip_prefix("nav:") {
            let instruction = instruction.trim();
            if instruction.is_empty() {
                return None;
            }
            return Some(Self::Navigation {
                instruction: instruction.to_string(),
            });
        }
        if let Some(rest) = line.strip_prefix("notify:") {
            let mut parts = rest.splitn(3, ':');
            let app = parts.next()?.trim().to_string();
            let title = parts
                .next()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from);
            let body = parts.next()?.trim().to_string();
            if app.is_empty() || body.is_empty() {
                return None;
            }
            return Some(Self::Notification { app, title, body });
        }
        None
    }

    /// The single line shown on the helmet.
    pub fn to_link_message(&self) -> String {
        match self {
            Self::IncomingCall { number } => format!(
                "CALL: Incoming from {}",
                number.as_deref().unwrap_or("Unknown")
            ),
            Self::CallAnswered => "CALL: Answered".to_string(),
            Self::CallEnded => "CALL: Ended".to_string(),
            Self::Navigation { instruction } => format!("NAV: {instruction}"),
            Self::Notification { app, title, body } => match title {
                Some(title) => format!("{app}: {title}: {body}"),
                None => format!("{app}: {body}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_call_events() {
        assert_eq!(
            HostEvent::parse("call:ringing:+43123456"),
            Some(HostEvent::IncomingCall {
                number: Some("+43123456".to_string())
            })
        );
        assert_eq!(
            HostEvent::parse("call:ringing"),
            Some(HostEvent::IncomingCall { number: None })
        );
        assert_eq!(HostEvent::parse("call:answered"), Some(HostEvent::CallAnswered));
        assert_eq!(HostEvent::parse("call:ended"), Some(HostEvent::CallEnded));
    }

    #[test]
    fn parse_notification_keeps_colons_in_body() {
        assert_eq!(
            HostEvent::parse("notify:WhatsApp:Bob:see you at 18:30"),
            Some(HostEvent::Notification {
                app: "WhatsApp".to_string(),
                title: Some("Bob".to_string()),
                body: "see you at 18:30".to_string(),
            })
        );
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert_eq!(HostEvent::parse("call:held"), None);
        assert_eq!(HostEvent::parse("nav:"), None);
        assert_eq!(HostEvent::parse("notify:OnlyApp"), None);
        assert_eq!(HostEvent::parse("garbage"), None);
    }

    #[test]
    fn call_messages_match_helmet_format() {
        assert_eq!(
            HostEvent::IncomingCall {
                number: Some("+43123456".to_string())
            }
            .to_link_message(),
            "CALL: Incoming from +43123456"
        );
        assert_eq!(
            HostEvent::IncomingCall { number: None }.to_link_message(),
            "CALL: Incoming from Unknown"
        );
        assert_eq!(HostEvent::CallAnswered.to_link_message(), "CALL: Answered");
        assert_eq!(HostEvent::CallEnded.to_link_message(), "CALL: Ended");
    }

    #[test]
    fn notification_messages_include_optional_title() {
        let with_title = HostEvent::Notification {
            app: "WhatsApp".to_string(),
            title: Some("Bob".to_string()),
            body: "hi".to_string(),
        };
        assert_eq!(with_title.to_link_message(), "WhatsApp: Bob: hi");

        let without_title = HostEvent::Notification {
            app: "Signal".to_string(),
            title: None,
            body: "new message".to_string(),
        };
        assert_eq!(without_title.to_link_message(), "Signal: new message");

        let nav = HostEvent::Navigation {
            instruction: "Turn left in 200m".to_string(),
        };
        assert_eq!(nav.to_link_message(), "NAV: Turn left in 200m");
    }
}
