//! MQTT client over the modem's embedded TLS stack (`+QMT*` and `+QSSLCFG`).
use core::fmt::Write;

use heapless::{String, Vec};

use super::{Command, ResponseMode};
use crate::config::TrackerConfig;
use crate::error::Error;

/// Message id used for subscribe and publish packets.
const MSG_ID: u8 = 1;
/// QoS requested for the command topic and used for publishes.
const QOS: u8 = 1;

/// Security level 2: verify the server and present a client certificate.
const SECURITY_LEVEL: u8 = 2;
/// TLS version 4: all versions.
const SSL_VERSION: u8 = 4;
/// Cipher suite 0xFFFF: all suites.
const CIPHER_SUITE: &str = "0xFFFF";

pub const BROKER_BATCH_LEN: usize = 12;

/// TLS/MQTT configuration followed by open, connect and subscribe.
pub fn broker_batch<C: TrackerConfig>() -> Result<Vec<Command, BROKER_BATCH_LEN>, Error> {
    let idx = C::MQTT_CLIENT_INDEX;
    let ssl = C::SSL_CONTEXT_ID;
    let net = |args: core::fmt::Arguments<'_>| {
        Command::format(args, ResponseMode::NetConfig, C::COMMAND_WAIT)
    };

    let mut batch = Vec::new();
    for cmd in [
        net(format_args!("AT+QMTCFG=\"recv/mode\",{},0,1", idx))?,
        net(format_args!("AT+QMTCFG=\"SSL\",{},1,{}", idx, ssl))?,
        net(format_args!("AT+QSSLCFG=\"cacert\",{},\"{}\"", ssl, C::CA_CERT))?,
        net(format_args!(
            "AT+QSSLCFG=\"clientcert\",{},\"{}\"",
            ssl,
            C::CLIENT_CERT
        ))?,
        net(format_args!(
            "AT+QSSLCFG=\"clientkey\",{},\"{}\"",
            ssl,
            C::CLIENT_KEY
        ))?,
        net(format_args!(
            "AT+QSSLCFG=\"seclevel\",{},{}",
            ssl, SECURITY_LEVEL
        ))?,
        net(format_args!(
            "AT+QSSLCFG=\"sslversion\",{},{}",
            ssl, SSL_VERSION
        ))?,
        net(format_args!(
            "AT+QSSLCFG=\"ciphersuite\",{},{}",
            ssl, CIPHER_SUITE
        ))?,
        Command::format(
            format_args!("AT+QSSLCFG=\"ignorelocaltime\",{},1", ssl),
            ResponseMode::MqttConfig,
            C::COMMAND_WAIT,
        )?,
        Command::format(
            format_args!("AT+QMTOPEN={},\"{}\",{}", idx, C::BROKER_HOST, C::BROKER_PORT),
            ResponseMode::MqttConfig,
            C::COMMAND_WAIT,
        )?,
        Command::format(
            format_args!("AT+QMTCONN={},\"{}\"", idx, C::CLIENT_ID),
            ResponseMode::MqttConfig,
            C::BROKER_WAIT,
        )?,
        subscribe::<C>()?,
    ] {
        batch.push(cmd).map_err(|_| Error::Overflow)?;
    }
    Ok(batch)
}

pub fn subscribe<C: TrackerConfig>() -> Result<Command, Error> {
    Command::format(
        format_args!(
            "AT+QMTSUB={},{},\"{}\",{}",
            C::MQTT_CLIENT_INDEX,
            MSG_ID,
            C::SUBSCRIBE_TOPIC,
            QOS
        ),
        ResponseMode::MqttConfig,
        C::BROKER_WAIT,
    )
}

/// Text the modem reports once the subscription was granted at the
/// requested QoS, e.g. `+QMTSUB: 0,1,0,1`.
pub fn subscribe_ack<C: TrackerConfig>() -> Result<String<24>, Error> {
    let mut ack = String::new();
    write!(ack, "+QMTSUB: {},{},0,{}", C::MQTT_CLIENT_INDEX, MSG_ID, QOS)
        .map_err(|_| Error::Overflow)?;
    Ok(ack)
}

/// First stage of a publish: announce topic and exact payload length.
/// The modem answers with a `>` prompt and then consumes `len` bytes.
pub fn publish_announce<C: TrackerConfig>(topic: &str, len: usize) -> Result<Command, Error> {
    Command::format(
        format_args!(
            "AT+QMTPUBEX={},{},{},0,\"{}\",{}",
            C::MQTT_CLIENT_INDEX,
            MSG_ID,
            QOS,
            topic,
            len
        ),
        ResponseMode::NetConfig,
        C::PUBLISH_PROMPT_WAIT,
    )
}
