//! Bus Message Envelopes
//!
//! ## Overview
//!
//! The vehicle bus carries typed messages wrapped in envelopes: a numeric
//! message id identifies the payload type, and a sender stamp tells apart
//! multiple senders of the same type. The two infrared sensors are the
//! important case: both publish [`VOLTAGE_READING`], and only the sender
//! stamp says which side of the car a reading came from.
//!
//! Decoding maps an envelope to a core [`StreamRecord`]. Message types the
//! predictor does not consume decode to `None` rather than an error; a
//! live bus carries plenty of traffic that is simply not ours.

use serde::{Deserialize, Serialize};

use kiwisteer_core::{time, StreamId, StreamRecord};

use crate::BusError;

/// IMU angular velocity message id
pub const ANGULAR_VELOCITY_READING: u32 = 1031;
/// Infrared distance sensor message id (both sides)
pub const VOLTAGE_READING: u32 = 1037;
/// Recorded ground-truth steering message id
pub const GROUND_STEERING_REQUEST: u32 = 1090;
/// Outgoing steering command message id
pub const STEERING_COMMAND: u32 = 1234;

/// Sender stamp of the left infrared sensor
pub const SENDER_IR_LEFT: u32 = 1;
/// Sender stamp of the right infrared sensor
pub const SENDER_IR_RIGHT: u32 = 3;
/// Sender stamp this predictor uses for its own commands
pub const SENDER_STEERING_COMMAND: u32 = 1234;

/// Decoded payload of a bus message the predictor knows about
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Three-axis angular velocity, radians per second
    AngularVelocity {
        /// Rotation about the longitudinal axis
        x: f32,
        /// Rotation about the lateral axis
        y: f32,
        /// Rotation about the vertical axis
        z: f32,
    },
    /// One infrared distance sensor voltage
    Voltage {
        /// Raw sensor voltage
        voltage: f32,
    },
    /// Ground-truth steering angle, radians
    GroundSteering {
        /// Requested steering angle
        steering: f32,
    },
    /// Steering command, radians
    SteeringCommand {
        /// Commanded steering angle
        steering: f32,
    },
}

/// One bus message: routing metadata plus a decoded payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type id
    pub message_id: u32,
    /// Distinguishes senders of the same message type
    pub sender_stamp: u32,
    /// Sample time, seconds part
    pub seconds: u64,
    /// Sample time, microseconds part
    pub micros: u32,
    /// The message body
    pub payload: Payload,
}

impl Envelope {
    /// Build an outgoing steering command envelope
    pub fn steering_command(seconds: u64, micros: u32, steering: f32) -> Self {
        Self {
            message_id: STEERING_COMMAND,
            sender_stamp: SENDER_STEERING_COMMAND,
            seconds,
            micros,
            payload: Payload::SteeringCommand { steering },
        }
    }
}

/// Map an envelope to the stream record it carries.
///
/// Returns `Ok(None)` for message types or sender stamps the predictor
/// does not consume. Returns an error only when a message *claims* one of
/// our types but its payload does not match, which indicates a
/// misconfigured bus rather than ordinary foreign traffic.
pub fn decode(envelope: &Envelope) -> Result<Option<StreamRecord>, BusError> {
    let mut buf = [0.0f32; 3];
    let (stream, values): (StreamId, &[f32]) = match (envelope.message_id, &envelope.payload) {
        (ANGULAR_VELOCITY_READING, Payload::AngularVelocity { x, y, z }) => {
            buf = [*x, *y, *z];
            (StreamId::AngularVelocity, &buf[..])
        }
        (VOLTAGE_READING, Payload::Voltage { voltage }) => {
            let stream = match envelope.sender_stamp {
                SENDER_IR_LEFT => StreamId::IrLeft,
                SENDER_IR_RIGHT => StreamId::IrRight,
                // voltage from a sender we do not know: not ours
                _ => return Ok(None),
            };
            buf[0] = *voltage;
            (stream, &buf[..1])
        }
        (GROUND_STEERING_REQUEST, Payload::GroundSteering { steering }) => {
            buf[0] = *steering;
            (StreamId::GroundSteering, &buf[..1])
        }
        (ANGULAR_VELOCITY_READING | VOLTAGE_READING | GROUND_STEERING_REQUEST, _) => {
            return Err(BusError::PayloadMismatch {
                message_id: envelope.message_id,
            })
        }
        _ => return Ok(None),
    };

    let timestamp = time::normalize(envelope.seconds, envelope.micros)
        .map_err(|_| BusError::BadTimestamp)?;
    let record = StreamRecord::new(stream, timestamp, values).map_err(BusError::BadRecord)?;
    Ok(Some(record))
}
