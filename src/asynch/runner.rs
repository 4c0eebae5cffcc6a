use embassy_futures::select::{select, Either};
use embassy_time::{Instant, Timer};
use embedded_io_async::{Read, Write};

use super::control::{ControlReceiver, ControlSignal};
use super::state::{self, SessionState};
use crate::alert::{self, AlertCode};
use crate::command::{gps, mqtt, network, Command, ResponseMode};
use crate::config::TrackerConfig;
use crate::coordinate::GpsFix;
use crate::error::Error;
use crate::payload::{classify, ClassifiedPayload};
use crate::peripherals::Peripherals;
use crate::publish::{self, PublishEnvelope};
use crate::transport::{lines, RawResponse, Transport};

const NO_SIM: &str = "NO SIM";
const ERROR: &str = "ERROR";
const PUBLISH_PROMPT: char = '>';

/// Returned by [`Runner::run`] when the session cannot continue and the
/// device has to be restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FatalRestart {
    pub cause: Error,
}

impl From<Error> for FatalRestart {
    fn from(cause: Error) -> Self {
        Self { cause }
    }
}

fn reports_no_sim(body: &str) -> bool {
    lines(body).any(|l| l.contains(NO_SIM))
}

fn reports_error(body: &str) -> bool {
    lines(body).any(|l| l == ERROR)
}

/// Background runner owning the modem link and the session.
///
/// You must call `.run()` in a background task for the tracker to operate.
pub struct Runner<'d, T, P, C> {
    ch: state::Runner<'d>,
    signals: ControlReceiver<'d>,
    transport: Transport<T>,
    peripherals: P,
    config: C,
    button_was_pressed: bool,
}

impl<'d, T, P, C> Runner<'d, T, P, C>
where
    T: Read + Write,
    P: Peripherals,
    C: TrackerConfig,
{
    pub(crate) fn new(
        ch: state::Runner<'d>,
        signals: ControlReceiver<'d>,
        transport: Transport<T>,
        peripherals: P,
        config: C,
    ) -> Self {
        Self {
            ch,
            signals,
            transport,
            peripherals,
            config,
            button_was_pressed: false,
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn session_state(&self) -> SessionState {
        self.ch.session_state(None)
    }

    /// Bring the session up and serve it until a fatal error.
    pub async fn run(&mut self) -> FatalRestart {
        self.ch.set_session_state(SessionState::Idle);

        if let Err(fatal) = self.start().await {
            error!("Fatal {:?}, device restart required", fatal.cause);
            self.ch.set_session_state(SessionState::Idle);
            return fatal;
        }

        loop {
            self.poll().await;
        }
    }

    async fn start(&mut self) -> Result<(), FatalRestart> {
        self.attach_network().await?;
        self.enable_gps().await?;
        self.connect_broker().await
    }

    async fn exchange(&mut self, cmd: &Command) -> Result<RawResponse, Error> {
        debug!("Query: {}", cmd.as_str());
        self.transport.send_line(cmd.as_str()).await?;
        let response = self.transport.receive(cmd.wait()).await?;
        trace!("Response: {}", response.as_str());
        Ok(response)
    }

    /// Issue a command whose answer is plain status text. `NO SIM` re-issues
    /// the SIM status query until the SIM is reported or the retry budget is
    /// spent. Nothing else changes the outcome.
    async fn net_config(&mut self, cmd: &Command) -> Result<(), Error> {
        let mut response = self.exchange(cmd).await;
        let mut issued = cmd.clone();

        loop {
            let no_sim = match &response {
                Ok(r) => reports_no_sim(r.body(issued.as_str())),
                Err(Error::TransportTimeout) => {
                    warn!("No response to {}", issued.as_str());
                    false
                }
                Err(e) => {
                    warn!("{} failed: {:?}", issued.as_str(), e);
                    false
                }
            };
            if !no_sim {
                return Ok(());
            }

            match self.ch.update_session(|s| s.retry_or_fail(Error::SimNotReady)) {
                Ok(attempt) => {
                    warn!(
                        "{} after {}, querying SIM again ({})",
                        NO_SIM,
                        issued.as_str(),
                        attempt
                    );
                    Timer::after(C::RETRY_PAUSE).await;
                    issued = network::sim_status::<C>()?;
                    response = self.exchange(&issued).await;
                }
                Err(e) => {
                    warn!("Giving up on SIM: {:?}", e);
                    return Ok(());
                }
            }
        }
    }

    /// Issue a broker stage command. `ERROR` is fatal. Anything else is a
    /// soft retry that lets the batch proceed.
    async fn mqtt_config(&mut self, cmd: &Command) -> Result<(), FatalRestart> {
        match self.exchange(cmd).await {
            Ok(r) if reports_error(r.body(cmd.as_str())) => {
                error!("Broker stage rejected {}", cmd.as_str());
                Err(FatalRestart::from(Error::ProtocolError))
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("{} got no usable answer: {:?}", cmd.as_str(), e);
                Timer::after(C::RETRY_PAUSE).await;
                Ok(())
            }
        }
    }

    /// Subscribe and wait for the acknowledgement, bounded by the session
    /// timeout. The acknowledgement may arrive with the command's answer or
    /// as a later URC.
    async fn subscribe(&mut self, cmd: &Command) -> Result<(), FatalRestart> {
        let ack = mqtt::subscribe_ack::<C>()?;
        let deadline = Instant::now() + C::SESSION_TIMEOUT;
        let mut response = self.exchange(cmd).await;

        loop {
            match &response {
                Ok(r) if reports_error(r.body(cmd.as_str())) => {
                    error!("Subscribe to {} rejected", C::SUBSCRIBE_TOPIC);
                    return Err(FatalRestart::from(Error::ProtocolError));
                }
                Ok(r) if r.as_str().contains(ack.as_str()) => {
                    info!("Subscribed to {}", C::SUBSCRIBE_TOPIC);
                    return Ok(());
                }
                Ok(_) => debug!("Waiting for subscribe acknowledgement"),
                Err(e) => debug!("Waiting for subscribe acknowledgement: {:?}", e),
            }

            if Instant::now() >= deadline {
                warn!("Subscribe acknowledgement not seen, continuing");
                return Ok(());
            }
            Timer::after(C::RETRY_PAUSE).await;
            response = self.transport.receive(C::BROKER_WAIT).await;
        }
    }

    pub async fn attach_network(&mut self) -> Result<(), Error> {
        self.ch.set_session_state(SessionState::AttachingNetwork);
        self.ch
            .update_session(|s| s.set_max_retry_attempts(C::MAX_SIM_RETRIES));

        for cmd in network::attach_batch::<C>()? {
            self.net_config(&cmd).await?;
            Timer::after(C::INTER_COMMAND_DELAY).await;
        }
        Ok(())
    }

    pub async fn enable_gps(&mut self) -> Result<(), Error> {
        self.ch.set_session_state(SessionState::EnablingGps);

        for cmd in gps::enable_batch::<C>()? {
            self.net_config(&cmd).await?;
            Timer::after(C::INTER_COMMAND_DELAY).await;
        }
        Ok(())
    }

    /// Configure TLS and MQTT, connect and subscribe, then announce liveness.
    pub async fn connect_broker(&mut self) -> Result<(), FatalRestart> {
        self.ch.set_session_state(SessionState::ConnectingBroker);

        let batch = mqtt::broker_batch::<C>()?;
        let last = batch.len().saturating_sub(1);
        for (i, cmd) in batch.iter().enumerate() {
            match cmd.mode() {
                ResponseMode::MqttConfig if i == last => self.subscribe(cmd).await?,
                ResponseMode::MqttConfig => self.mqtt_config(cmd).await?,
                _ => self.net_config(cmd).await?,
            }
            Timer::after(C::INTER_COMMAND_DELAY).await;
        }

        self.ch.set_session_state(SessionState::Subscribed);
        if let Err(e) = self.publish(PublishEnvelope::Status).await {
            warn!("Status publish failed: {:?}", e);
        }
        Ok(())
    }

    /// Two-stage publish of `envelope`.
    pub async fn publish(&mut self, envelope: PublishEnvelope) -> Result<(), Error> {
        let request = publish::prepare::<C>(&envelope)?;

        match self.exchange(&request.announce).await {
            Ok(r) if r.as_str().contains(PUBLISH_PROMPT) => {}
            Ok(_) | Err(Error::TransportTimeout) => {
                warn!("No publish prompt, sending payload anyway")
            }
            Err(e) => return Err(e),
        }

        debug!("Payload: {}", request.payload.as_str());
        self.transport.send_line(&request.payload).await?;
        let ack = self.transport.receive(C::PUBLISH_ACK_WAIT).await?;
        if reports_error(ack.as_str()) {
            return Err(Error::PublishRejected);
        }
        info!("Published {} bytes to {}", request.payload.len(), envelope.topic::<C>());
        Ok(())
    }

    /// Query a GNSS fix and publish it.
    pub async fn report_location(&mut self) -> Result<GpsFix, Error> {
        let cmd = gps::location_query::<C>()?;
        let response = self.exchange(&cmd).await?;

        let fix = match classify(response.body(cmd.as_str())) {
            ClassifiedPayload::CsvFields(fields) => GpsFix::from_fields(&fields)?,
            _ => return Err(Error::InvalidCoordinate),
        };

        self.publish(PublishEnvelope::Location(fix)).await?;
        Ok(fix)
    }

    async fn report_location_logged(&mut self) {
        match self.report_location().await {
            Ok(fix) => info!("Location reported: {}, {}", fix.latitude, fix.longitude),
            Err(e) => warn!("Location not reported: {:?}", e),
        }
    }

    async fn act_on(&mut self, code: AlertCode) {
        match code {
            AlertCode::None => trace!("No actionable alert"),
            AlertCode::LocationRequest => self.report_location_logged().await,
            AlertCode::StatusRequest => {
                if let Err(e) = self.publish(PublishEnvelope::Status).await {
                    warn!("Status publish failed: {:?}", e);
                }
            }
            disaster => {
                if let Some(track) = disaster.track() {
                    info!("Alert {:?}, playing {}", disaster, track);
                    self.peripherals.play_track(track);
                    self.peripherals.set_indicator(true);
                    self.ch.set_session_state(SessionState::PlayingAlert);
                }
            }
        }
    }

    async fn handle_signal(&mut self, signal: ControlSignal) {
        debug!("Control signal {:?}", signal);
        match signal {
            ControlSignal::StopAlert => {
                if self.session_state() != SessionState::PlayingAlert {
                    debug!("No alert playing");
                    return;
                }
                self.peripherals.stop_track();
                self.peripherals.set_indicator(false);
                self.ch.set_session_state(SessionState::Subscribed);
                self.report_location_logged().await;
            }
            ControlSignal::LongPress => self.report_location_logged().await,
        }
    }

    /// Turn the button into control signals: a press while an alert plays
    /// stops it, a long press requests a location report.
    fn button_signal(&mut self) -> Option<ControlSignal> {
        let pressed = self.peripherals.is_user_button_pressed();
        let press_edge = pressed && !self.button_was_pressed;
        self.button_was_pressed = pressed;

        if self.peripherals.is_long_press_detected() {
            Some(ControlSignal::LongPress)
        } else if press_edge && self.session_state() == SessionState::PlayingAlert {
            Some(ControlSignal::StopAlert)
        } else {
            None
        }
    }

    /// One steady-state cycle. Outside `Subscribed` and `PlayingAlert` this
    /// does nothing and leaves queued signals alone.
    pub async fn poll(&mut self) {
        if !self.session_state().is_steady() {
            return;
        }

        if let Some(signal) = self.button_signal() {
            self.handle_signal(signal).await;
        }
        while let Ok(signal) = self.signals.try_receive() {
            self.handle_signal(signal).await;
        }

        match self.session_state() {
            SessionState::Subscribed => match self.transport.receive(C::POLL_WINDOW).await {
                Ok(response) => {
                    if let ClassifiedPayload::JsonObject(json) = classify(response.as_str()) {
                        match alert::decode(json) {
                            Ok(code) => self.act_on(code).await,
                            Err(e) => warn!("Dropping alert frame: {:?}", e),
                        }
                    }
                }
                Err(Error::TransportTimeout) => {}
                Err(e) => {
                    warn!("Listening failed: {:?}", e);
                    Timer::after(C::POLL_WINDOW).await;
                }
            },
            SessionState::PlayingAlert => {
                if let Either::First(signal) =
                    select(self.signals.receive(), Timer::after(C::POLL_WINDOW)).await
                {
                    self.handle_signal(signal).await;
                }
                if let Ok(n) = self.transport.drain().await {
                    if n > 0 {
                        debug!("Ignored {} bytes while alert plays", n);
                    }
                }
            }
            _ => {}
        }
    }
}
