//! In-memory MT-SICS balance.
//!
//! Answers every catalog command the way a real balance does, synchronously
//! from `write_line`. A cloned [`SimControl`] lets tests and the CLI change
//! the reading, silence the device, or inject unsolicited lines after the
//! transport has been moved into the engine.
use crate::error::HwError;
use sics_traits::{BoxError, Transport, TransportEvent, TransportNotify};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct Identity {
    model: String,
    scale_type: String,
    serial: String,
    firmware: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            model: "XPE205".to_string(),
            scale_type: "XPE205 220.00900 g".to_string(),
            serial: "B123456789".to_string(),
            firmware: "2.10".to_string(),
        }
    }
}

struct SimState {
    notify: Option<TransportNotify>,
    open: bool,
    silent: bool,
    fail_open: bool,
    weight_g: f64,
    stable: bool,
    tare_g: f64,
    step_g: f64,
    codes: [u8; 4], // M01, M02, M03, M16
    identity: Identity,
    device_id: String,
    received: Vec<String>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            notify: None,
            open: false,
            silent: false,
            fail_open: false,
            weight_g: 0.0,
            stable: true,
            tare_g: 0.0,
            step_g: 0.0,
            codes: [0, 2, 1, 1],
            identity: Identity::default(),
            device_id: String::new(),
            received: Vec::new(),
        }
    }
}

impl SimState {
    fn deliver(&mut self, ev: TransportEvent) {
        if let Some(notify) = self.notify.as_mut() {
            notify(ev);
        }
    }

    /// Reply line for one request, or `None` when the balance would stay quiet.
    fn reply_to(&mut self, request: &str) -> Option<String> {
        let token = request.split_whitespace().next().unwrap_or("");
        let reply = match token {
            "@" => format!("I4 A \"{}\"", self.identity.serial),
            "SI" => {
                let reading = format!(
                    "S {} {:>10.3} g",
                    if self.stable { 'S' } else { 'D' },
                    self.weight_g
                );
                self.weight_g += self.step_g;
                reading
            }
            "TA" => format!("TA A {:>10.3} g", self.tare_g),
            "I11" => format!("I11 A \"{}\"", self.identity.model),
            "I2" => format!("I2 A \"{}\"", self.identity.scale_type),
            "I4" => format!("I4 A \"{}\"", self.identity.serial),
            "I3" => format!("I3 A \"{}\"", self.identity.firmware),
            "M01" => format!("M01 A {}", self.codes[0]),
            "M02" => format!("M02 A {}", self.codes[1]),
            "M03" => format!("M03 A {}", self.codes[2]),
            "M16" => format!("M16 A {}", self.codes[3]),
            "I10" => {
                if let Some(tag) = request.split('"').nth(1) {
                    self.device_id = tag.to_string();
                }
                "I10 A".to_string()
            }
            "TIM" | "DAT" | "D" | "DW" | "M12" => format!("{token} A"),
            "" => return None,
            _ => "ES".to_string(),
        };
        Some(reply)
    }
}

/// Handle for steering a [`SimulatedBalance`] from outside the engine.
#[derive(Clone)]
pub struct SimControl {
    state: Arc<Mutex<SimState>>,
}

impl SimControl {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn set_weight(&self, grams: f64, stable: bool) {
        let mut s = self.lock();
        s.weight_g = grams;
        s.stable = stable;
    }

    /// Add `grams` to the reading after every weight reply.
    pub fn set_weight_step(&self, grams: f64) {
        self.lock().step_g = grams;
    }

    pub fn set_tare(&self, grams: f64) {
        self.lock().tare_g = grams;
    }

    /// Silent balances receive commands but never reply.
    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    pub fn set_serial_number(&self, serial: &str) {
        self.lock().identity.serial = serial.to_string();
    }

    /// Raw config codes reported for M01, M02, M03 and M16.
    pub fn set_codes(&self, codes: [u8; 4]) {
        self.lock().codes = codes;
    }

    /// Deliver a line the engine did not ask for (keypad print, status line).
    pub fn inject_line(&self, line: &str) {
        let mut s = self.lock();
        if s.open {
            s.deliver(TransportEvent::Line(format!("{line}\r\n")));
        }
    }

    /// Simulate the cable being pulled: an error followed by close.
    pub fn unplug(&self) {
        let mut s = self.lock();
        if s.open {
            s.open = false;
            s.deliver(TransportEvent::Error(HwError::Unplugged.to_string()));
            s.deliver(TransportEvent::Closed);
            s.notify = None;
        }
    }

    /// Every line written to the balance, terminators stripped.
    pub fn received(&self) -> Vec<String> {
        self.lock().received.clone()
    }

    /// Tag last written with `I10`.
    pub fn device_id(&self) -> String {
        self.lock().device_id.clone()
    }
}

pub struct SimulatedBalance {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedBalance {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBalance {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    pub fn control(&self) -> SimControl {
        SimControl {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Transport for SimulatedBalance {
    fn open(&mut self, notify: TransportNotify) -> Result<(), BoxError> {
        let mut s = self.lock();
        if s.fail_open {
            return Err(Box::new(HwError::Serial("simulated open failure".into())));
        }
        if s.open {
            return Err(Box::new(HwError::AlreadyOpen));
        }
        s.open = true;
        s.notify = Some(notify);
        tracing::debug!("simulated balance opened");
        Ok(())
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), BoxError> {
        let mut s = self.lock();
        if !s.open {
            return Err(Box::new(HwError::NotOpen));
        }
        let request = String::from_utf8_lossy(line).trim_end().to_string();
        s.received.push(request.clone());
        if s.silent {
            return Ok(());
        }
        if let Some(reply) = s.reply_to(&request) {
            tracing::trace!(%request, %reply, "simulated reply");
            s.deliver(TransportEvent::Line(format!("{reply}\r\n")));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        let mut s = self.lock();
        if s.open {
            s.open = false;
            s.deliver(TransportEvent::Closed);
            s.notify = None;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }
}
