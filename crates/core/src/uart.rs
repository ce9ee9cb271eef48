// ThumbLab - Thumb-2 Teaching Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Console device behind `bl uart_write` / `bl uart_read`.
///
/// Everything a program writes is kept in `output`; an optional shared sink
/// receives a copy so a front end can display text while a run is in flight.
#[derive(Debug, Default, serde::Serialize)]
pub struct Uart {
    output: Vec<u8>,
    #[serde(skip)]
    input: VecDeque<u8>,
    #[serde(skip)]
    sink: Option<Arc<Mutex<Vec<u8>>>>,
    echo_stdout: bool,
}

impl Uart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sink(&mut self, sink: Option<Arc<Mutex<Vec<u8>>>>, echo_stdout: bool) {
        self.sink = sink;
        self.echo_stdout = echo_stdout;
    }

    pub fn set_echo_stdout(&mut self, echo: bool) {
        self.echo_stdout = echo;
    }

    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    pub fn write_byte(&mut self, value: u8) {
        self.output.push(value);

        if let Some(sink) = &self.sink {
            if let Ok(mut guard) = sink.lock() {
                guard.push(value);
            }
        }

        if self.echo_stdout {
            #[allow(unused_must_use)]
            {
                print!("{}", value as char);
                io::stdout().flush();
            }
        }
    }

    /// Next pending input byte, `None` when the input queue is drained.
    pub fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Restores captured output. Pending input and the sink are session state and stay as they are.
    pub fn restore(&mut self, state: &serde_json::Value) {
        #[derive(serde::Deserialize)]
        struct UartState {
            #[serde(default)]
            output: Vec<u8>,
        }
        match serde_json::from_value::<UartState>(state.clone()) {
            Ok(s) => self.output = s.output,
            Err(e) => tracing::warn!("Ignoring malformed UART snapshot: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Uart;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_uart_output_and_sink() {
        let mut uart = Uart::new();
        let sink = Arc::new(Mutex::new(Vec::new()));
        uart.set_sink(Some(sink.clone()), false);

        uart.write_byte(b'H');
        uart.write_byte(b'i');

        assert_eq!(uart.output(), b"Hi");
        assert_eq!(sink.lock().unwrap().clone(), b"Hi".to_vec());
        assert_eq!(uart.output_text(), "Hi");
    }

    #[test]
    fn test_uart_input_queue() {
        let mut uart = Uart::new();
        uart.push_input(b"ab");
        assert_eq!(uart.pending_input(), 2);
        assert_eq!(uart.read_byte(), Some(b'a'));
        assert_eq!(uart.read_byte(), Some(b'b'));
        assert_eq!(uart.read_byte(), None);
    }

    #[test]
    fn test_uart_snapshot_contains_output() {
        let mut uart = Uart::new();
        uart.write_byte(b'x');
        let snap = uart.snapshot();
        assert_eq!(snap["output"], serde_json::json!([120]));

        let mut other = Uart::new();
        other.restore(&snap);
        assert_eq!(other.output(), b"x");
    }
}
