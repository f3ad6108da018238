//! Closed-loop helpers built on the controller API

use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use gimbal_control::{GimbalController, Transport};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Proportional gain from degrees of error to percent speed
pub const ROTATE_GAIN: f32 = 3.0;

pub const YAW_LIMITS: (f32, f32) = (-45.0, 45.0);
pub const PITCH_LIMITS: (f32, f32) = (-90.0, 25.0);

#[derive(Debug, Clone, Copy)]
pub struct RotateTarget {
    pub yaw: f32,
    pub pitch: f32,
    /// Stop once both errors are within this many degrees
    pub threshold: f32,
    pub max_iterations: u32,
    /// Delay between speed commands
    pub period: Duration,
}

impl RotateTarget {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self {
            yaw,
            pitch,
            threshold: 1.0,
            max_iterations: 300,
            period: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RotateOutcome {
    Reached { iterations: u32 },
    NoAttitude,
    SpeedRejected,
    IterationLimit,
}

/// Drive the gimbal to `target` yaw/pitch using speed commands
pub fn rotate_to<T: Transport>(
    controller: &mut GimbalController<T>,
    target: RotateTarget,
) -> Result<RotateOutcome> {
    if !(PITCH_LIMITS.0..=PITCH_LIMITS.1).contains(&target.pitch) {
        bail!(
            "Desired pitch {} is outside controllable range {}~{}",
            target.pitch,
            PITCH_LIMITS.0,
            PITCH_LIMITS.1
        );
    }
    if !(YAW_LIMITS.0..=YAW_LIMITS.1).contains(&target.yaw) {
        bail!(
            "Desired yaw {} is outside controllable range {}~{}",
            target.yaw,
            YAW_LIMITS.0,
            YAW_LIMITS.1
        );
    }

    for iteration in 0..target.max_iterations {
        let attitude = match controller.gimbal_attitude() {
            Ok(attitude) => attitude,
            Err(e) => {
                warn!("Gimbal attitude feedback unavailable ({}), not rotating", e);
                return Ok(RotateOutcome::NoAttitude);
            }
        };

        // Reported yaw grows opposite to positive yaw speed
        let yaw_err = attitude.yaw - target.yaw;
        let pitch_err = target.pitch - attitude.pitch;
        debug!("yaw_err={:.1} pitch_err={:.1}", yaw_err, pitch_err);

        if yaw_err.abs() <= target.threshold && pitch_err.abs() <= target.threshold {
            if let Err(e) = controller.set_gimbal_speed(0, 0) {
                warn!("Could not stop gimbal: {}", e);
            }
            info!("Goal rotation is reached");
            return Ok(RotateOutcome::Reached {
                iterations: iteration,
            });
        }

        let yaw_speed = (ROTATE_GAIN * yaw_err) as i32;
        let pitch_speed = (ROTATE_GAIN * pitch_err) as i32;
        debug!("speed setpoint yaw={} pitch={}", yaw_speed, pitch_speed);

        match controller.set_gimbal_speed(yaw_speed, pitch_speed) {
            Ok(true) => {}
            Ok(false) => {
                warn!("Could not set gimbal speed");
                return Ok(RotateOutcome::SpeedRejected);
            }
            Err(e) => {
                warn!("Could not set gimbal speed: {}", e);
                return Ok(RotateOutcome::SpeedRejected);
            }
        }

        thread::sleep(target.period);
    }

    warn!(
        "Gave up after {} iterations without reaching target",
        target.max_iterations
    );
    if let Err(e) = controller.set_gimbal_speed(0, 0) {
        warn!("Could not stop gimbal: {}", e);
    }
    Ok(RotateOutcome::IterationLimit)
}
