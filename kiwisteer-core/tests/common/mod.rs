//! Common test utilities for integration tests
//!
//! Provides synthetic recording generation: four stream logs whose
//! steering target is a fixed linear function of the sensor values, so a
//! fitted model has something real to recover. File writers emit the
//! semicolon CSV layout of real recording sessions.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use kiwisteer_core::{RecordingPaths, StreamId, StreamLog, StreamRecord};

const TS_HEADER: &str = "sampleTimeStamp.seconds;sampleTimeStamp.microseconds";

/// Deterministic pseudo-noise without a rand dependency
pub struct Noise(u32);

impl Noise {
    pub fn new(seed: u32) -> Self {
        Self(seed.max(1))
    }

    /// Pseudo-random value in [-amplitude, amplitude]
    pub fn sample(&mut self, amplitude: f32) -> f32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        (x as f32 / u32::MAX as f32 * 2.0 - 1.0) * amplitude
    }
}

/// One synthetic driving session: `ticks` seconds at 1 Hz with a little
/// timestamp jitter per stream, steering derived from the IR voltages.
pub struct SyntheticRecording {
    pub angular_velocity: StreamLog,
    pub ir_left: StreamLog,
    pub ir_right: StreamLog,
    pub ground_steering: StreamLog,
}

impl SyntheticRecording {
    pub fn generate(ticks: usize, seed: u32) -> Self {
        let mut noise = Noise::new(seed);
        let mut av = Vec::new();
        let mut irl = Vec::new();
        let mut irr = Vec::new();
        let mut gs = Vec::new();

        for s in 0..ticks {
            let base = s as u64 * 1_000_000;
            let jitter = |n: &mut Noise| (n.sample(1.0) * 40_000.0) as i64;

            let left = 1.2 + noise.sample(0.3);
            let right = 1.8 + noise.sample(0.3);
            // steering turns away from the nearer obstacle
            let steering = 0.3 * (right - left);

            let t = |base: u64, j: i64| base.saturating_add_signed(j);
            av.push(
                StreamRecord::new(
                    StreamId::AngularVelocity,
                    t(base, jitter(&mut noise)),
                    &[noise.sample(0.05), noise.sample(0.05), steering * 0.5],
                )
                .unwrap(),
            );
            irl.push(StreamRecord::new(StreamId::IrLeft, t(base, jitter(&mut noise)), &[left]).unwrap());
            irr.push(StreamRecord::new(StreamId::IrRight, t(base, jitter(&mut noise)), &[right]).unwrap());
            gs.push(
                StreamRecord::new(StreamId::GroundSteering, t(base, jitter(&mut noise)), &[steering])
                    .unwrap(),
            );
        }

        Self {
            angular_velocity: StreamLog::new(StreamId::AngularVelocity, av),
            ir_left: StreamLog::new(StreamId::IrLeft, irl),
            ir_right: StreamLog::new(StreamId::IrRight, irr),
            ground_steering: StreamLog::new(StreamId::GroundSteering, gs),
        }
    }

    pub fn logs(&self) -> Vec<StreamLog> {
        vec![
            self.angular_velocity.clone(),
            self.ir_left.clone(),
            self.ir_right.clone(),
            self.ground_steering.clone(),
        ]
    }

    /// Feature-stream logs only, as an online replay would see them
    pub fn feature_logs(&self) -> Vec<StreamLog> {
        vec![
            self.angular_velocity.clone(),
            self.ir_left.clone(),
            self.ir_right.clone(),
        ]
    }

    /// Write the recording as four CSV files under `dir`
    pub fn write_to(&self, dir: &Path) -> RecordingPaths {
        RecordingPaths {
            angular_velocity: write_log(
                dir,
                "opendlv.proxy.AngularVelocityReading.csv",
                &format!("{TS_HEADER};angularVelocityX;angularVelocityY;angularVelocityZ"),
                &self.angular_velocity,
            ),
            ir_left: write_log(
                dir,
                "opendlv.proxy.VoltageReading-1.csv",
                &format!("{TS_HEADER};voltage"),
                &self.ir_left,
            ),
            ir_right: write_log(
                dir,
                "opendlv.proxy.VoltageReading-3.csv",
                &format!("{TS_HEADER};voltage"),
                &self.ir_right,
            ),
            ground_steering: write_log(
                dir,
                "opendlv.proxy.GroundSteeringRequest.csv",
                &format!("{TS_HEADER};groundSteering"),
                &self.ground_steering,
            ),
        }
    }
}

fn write_log(dir: &Path, name: &str, header: &str, log: &StreamLog) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{header}").unwrap();
    for rec in &log.records {
        let seconds = rec.timestamp() / 1_000_000;
        let micros = rec.timestamp() % 1_000_000;
        let values: Vec<String> = rec.values().iter().map(|v| v.to_string()).collect();
        writeln!(file, "{seconds};{micros};{}", values.join(";")).unwrap();
    }
    path
}
