use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::future::poll_fn;
use core::task::Poll;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::config::{Apn, TrackerConfig};
use crate::peripherals::{AlertPlayer, Peripherals};

pub const GGA_RESPONSE: &str = "\r\n+QGPSGNMEA: $GPGGA,141009.00,2824.04883,N,07721.32483,E,1,08,0.9,179.9,M,,M,,*7E\r\n\r\nOK\r\n";

pub struct TestConfig;

impl TrackerConfig for TestConfig {
    const DEVICE_ID: &'static str = "1";
    const BROKER_HOST: &'static str = "broker.example.com";
    const CLIENT_ID: &'static str = "M26_0206";
    const SUBSCRIBE_TOPIC: &'static str = "AWS/CIER/SUB/1";

    const APN: Apn<'static> = Apn::Given {
        name: "airtelgprs.com",
        username: None,
        password: None,
    };

    const MAX_SIM_RETRIES: u8 = 3;

    const COMMAND_WAIT: Duration = Duration::from_millis(20);
    const BROKER_WAIT: Duration = Duration::from_millis(20);
    const IDLE_GAP: Duration = Duration::from_millis(2);
    const INTER_COMMAND_DELAY: Duration = Duration::from_millis(0);
    const RETRY_PAUSE: Duration = Duration::from_millis(1);
    const PUBLISH_PROMPT_WAIT: Duration = Duration::from_millis(20);
    const PUBLISH_ACK_WAIT: Duration = Duration::from_millis(20);
    const POLL_WINDOW: Duration = Duration::from_millis(10);
    const SESSION_TIMEOUT: Duration = Duration::from_millis(60);
}

#[derive(Default)]
struct ModemInner {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    line: Vec<u8>,
    sent: Vec<String>,
    /// Replies queued by tests; the last one of a prefix repeats.
    script: Vec<(String, VecDeque<Option<String>>)>,
    /// Fallback replies by prefix.
    presets: Vec<(String, String)>,
    closed: bool,
}

impl ModemInner {
    fn scripted(&mut self, line: &str) -> Option<Option<String>> {
        let (_, replies) = self
            .script
            .iter_mut()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))?;
        if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        }
    }

    fn answer(&mut self, line: String) {
        let reply = match self.scripted(&line) {
            Some(reply) => reply,
            None => Some(
                self.presets
                    .iter()
                    .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                    .map(|(_, reply)| reply.clone())
                    .unwrap_or_else(|| "\r\nOK\r\n".to_string()),
            ),
        };

        if let Some(reply) = reply {
            self.rx.extend(line.as_bytes());
            self.rx.push_back(b'\r');
            self.rx.extend(reply.as_bytes());
        }
        self.sent.push(line);
    }
}

/// Scripted modem. Every line written is echoed and answered with `OK`
/// unless a reply was scripted for its prefix.
#[derive(Clone, Default)]
pub struct MockModem {
    inner: Rc<RefCell<ModemInner>>,
}

impl MockModem {
    pub fn new() -> Self {
        Self::default()
    }

    /// A modem with a registered SIM, a granted subscription, a publish
    /// prompt and a GNSS fix.
    pub fn tracker() -> Self {
        let modem = Self::new();
        {
            let mut inner = modem.inner.borrow_mut();
            for (prefix, reply) in [
                ("AT+CPIN?", "\r\n+CPIN: READY\r\n\r\nOK\r\n"),
                ("AT+QMTOPEN=", "\r\nOK\r\n\r\n+QMTOPEN: 0,0\r\n"),
                ("AT+QMTCONN=", "\r\nOK\r\n\r\n+QMTCONN: 0,0,0\r\n"),
                ("AT+QMTSUB=", "\r\nOK\r\n\r\n+QMTSUB: 0,1,0,1\r\n"),
                ("AT+QMTPUBEX=", "\r\n> "),
                ("AT+QGPSGNMEA=", GGA_RESPONSE),
            ] {
                inner.presets.push((prefix.to_string(), reply.to_string()));
            }
        }
        modem
    }

    /// Queue `reply` for the next line starting with `prefix`.
    pub fn reply(&self, prefix: &str, reply: &str) {
        self.push_script(prefix, Some(reply.to_string()));
    }

    /// Lines starting with `prefix` get no answer at all, not even an echo.
    pub fn silence(&self, prefix: &str) {
        self.push_script(prefix, None);
    }

    fn push_script(&self, prefix: &str, reply: Option<String>) {
        let mut inner = self.inner.borrow_mut();
        match inner.script.iter().position(|(p, _)| p == prefix) {
            Some(i) => inner.script[i].1.push_back(reply),
            None => inner
                .script
                .push((prefix.to_string(), VecDeque::from([reply]))),
        }
    }

    pub fn push_unsolicited(&self, text: &str) {
        self.push_bytes(text.as_bytes());
    }

    pub fn push_bytes(&self, bytes: &[u8]) {
        self.inner.borrow_mut().rx.extend(bytes);
    }

    /// From now on an empty receive buffer reads as end of stream.
    pub fn close(&self) {
        self.inner.borrow_mut().closed = true;
    }

    /// Everything written so far, raw.
    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.inner.borrow().tx).into_owned()
    }

    /// Lines written since the last [`MockModem::clear_sent`].
    pub fn sent(&self) -> Vec<String> {
        self.inner.borrow().sent.clone()
    }

    pub fn count_sent(&self, prefix: &str) -> usize {
        self.inner
            .borrow()
            .sent
            .iter()
            .filter(|l| l.starts_with(prefix))
            .count()
    }

    pub fn clear_sent(&self) {
        self.inner.borrow_mut().sent.clear();
    }
}

impl embedded_io_async::ErrorType for MockModem {
    type Error = Infallible;
}

impl embedded_io_async::Read for MockModem {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        // Only the task under test feeds the modem, so an empty buffer stays
        // empty until the surrounding timeout fires.
        poll_fn(|_| {
            let mut inner = self.inner.borrow_mut();
            if inner.rx.is_empty() {
                return if inner.closed {
                    Poll::Ready(Ok(0))
                } else {
                    Poll::Pending
                };
            }
            let n = buf.len().min(inner.rx.len());
            for (dst, src) in buf.iter_mut().zip(inner.rx.drain(..n)) {
                *dst = src;
            }
            Poll::Ready(Ok(n))
        })
        .await
    }
}

impl embedded_io_async::Write for MockModem {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut inner = self.inner.borrow_mut();
        inner.tx.extend_from_slice(buf);
        for &b in buf {
            if b == b'\n' {
                let raw = core::mem::take(&mut inner.line);
                let line = String::from_utf8_lossy(&raw).trim_end().to_string();
                inner.answer(line);
            } else {
                inner.line.push(b);
            }
        }
        Ok(buf.len())
    }
}

/// Records peripheral requests; the button is driven by the test.
#[derive(Clone, Default)]
pub struct MockPeripherals {
    events: Rc<RefCell<Vec<String>>>,
    button: Rc<Cell<bool>>,
    long_press: Rc<Cell<bool>>,
}

impl MockPeripherals {
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn set_button(&self, pressed: bool) {
        self.button.set(pressed);
    }

    /// Report a long press on the next check only.
    pub fn trigger_long_press(&self) {
        self.long_press.set(true);
    }
}

impl Peripherals for MockPeripherals {
    fn play_track(&mut self, track: &str) {
        self.events.borrow_mut().push(std::format!("play {}", track));
    }

    fn stop_track(&mut self) {
        self.events.borrow_mut().push("stop".to_string());
    }

    fn set_indicator(&mut self, on: bool) {
        let event = if on { "indicator on" } else { "indicator off" };
        self.events.borrow_mut().push(event.to_string());
    }

    fn is_user_button_pressed(&mut self) -> bool {
        self.button.get()
    }

    fn is_long_press_detected(&mut self) -> bool {
        self.long_press.replace(false)
    }
}

#[derive(Clone, Default)]
pub struct RecordingPlayer {
    events: Rc<RefCell<Vec<String>>>,
}

impl RecordingPlayer {
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl AlertPlayer for RecordingPlayer {
    fn play(&mut self, track: &str) {
        self.events.borrow_mut().push(std::format!("play {}", track));
    }

    fn stop(&mut self) {
        self.events.borrow_mut().push("stop".to_string());
    }
}

/// Active-low button; released by default.
#[derive(Clone, Default)]
pub struct MockInput {
    low: Rc<Cell<bool>>,
}

impl MockInput {
    pub fn press(&self) {
        self.low.set(true);
    }

    pub fn release(&self) {
        self.low.set(false);
    }
}

impl ErrorType for MockInput {
    type Error = Infallible;
}

impl InputPin for MockInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.low.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.low.get())
    }
}

#[derive(Clone, Default)]
pub struct MockOutput {
    high: Rc<Cell<bool>>,
}

impl MockOutput {
    pub fn is_high(&self) -> bool {
        self.high.get()
    }
}

impl ErrorType for MockOutput {
    type Error = Infallible;
}

impl OutputPin for MockOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.set(true);
        Ok(())
    }
}
