//! Test data builders for creating event logs

use macro_recorder::{Event, EventLog, KeyRepr, MouseButton};

/// Builder for creating test EventLogs
#[derive(Default)]
pub struct LogBuilder {
    events: Vec<Event>,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moves_to(mut self, time: f64, x: i32, y: i32) -> Self {
        self.events.push(Event::pointer_move(time, x, y));
        self
    }

    pub fn clicks(mut self, time: f64, x: i32, y: i32, button: MouseButton) -> Self {
        self.events
            .push(Event::pointer_button(time, x, y, button, true));
        self.events
            .push(Event::pointer_button(time, x, y, button, false));
        self
    }

    pub fn scrolls(mut self, time: f64, dx: i32, dy: i32) -> Self {
        self.events.push(Event::pointer_scroll(time, 0, 0, dx, dy));
        self
    }

    pub fn presses(mut self, time: f64, key: &str) -> Self {
        self.events.push(Event::key(time, KeyRepr::parse(key), true));
        self
    }

    pub fn releases(mut self, time: f64, key: &str) -> Self {
        self.events.push(Event::key(time, KeyRepr::parse(key), false));
        self
    }

    pub fn build(self) -> EventLog {
        EventLog::from_events(chrono::Local::now().naive_local(), self.events)
    }
}

/// The 3-event session from the reference scenario: move, then type "a"
pub fn reference_session() -> EventLog {
    LogBuilder::new()
        .moves_to(0.0, 10, 20)
        .presses(1.0, "a")
        .releases(1.05, "a")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_builder() {
        let log = LogBuilder::new()
            .clicks(0.5, 1, 2, MouseButton::Left)
            .presses(0.6, "Key.esc")
            .build();

        assert_eq!(log.count(), 3);
        assert_eq!(log.duration(), 0.6);
    }
}
