//! The single transient alert shown above the list.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Info,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub seq: u32,
    pub message: String,
    pub kind: AlertKind,
}

/// Each shown alert gets a fresh sequence number; a dismissal only clears
/// the alert it was scheduled for.
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    current: Option<Alert>,
    next_seq: u32,
}

impl AlertState {
    /// Replaces the current alert and returns the sequence number its timer
    /// should dismiss.
    pub fn show(&mut self, message: &str, kind: AlertKind) -> u32 {
        self.next_seq = self.next_seq.wrapping_add(1);
        self.current = Some(Alert {
            seq: self.next_seq,
            message: message.to_string(),
            kind,
        });
        self.next_seq
    }

    pub fn dismiss(&mut self, seq: u32) {
        if self.current.as_ref().is_some_and(|a| a.seq == seq) {
            self.current = None;
        }
    }

    pub fn current(&self) -> Option<&Alert> {
        self.current.as_ref()
    }
}
