//! Typed gimbal operations over a request/response transport

use std::thread;
use std::time::Duration;

use gimbal_protocol::payload::{parse_ack, parse_zoom_level};
use gimbal_protocol::{
    decode_frame, to_hex, Attitude, Command, FirmwareVersion, FocusDirection, FunctionFeedback,
    GimbalInfo, HardwareId, MotionMode, PhotoAction, RecordState, ZoomDirection, SPEED_RANGE,
};
use tracing::{debug, error, info, trace, warn};

use crate::error::{ControlError, Result};
use crate::transport::{Transport, UdpTransport};
use crate::ControlConfig;

/// Pause between firing a record toggle and asking for feedback
pub const COMMAND_SETTLE: Duration = Duration::from_millis(100);

/// Gimbal camera controller.
///
/// Operations take `&mut self`, so at most one request is ever in flight.
/// Replies are matched to requests purely by arrival order; the frame
/// sequence field is always zero and is not checked.
pub struct GimbalController<T: Transport = UdpTransport> {
    transport: T,
    config: ControlConfig,
}

impl GimbalController<UdpTransport> {
    pub fn new(config: ControlConfig) -> Self {
        let transport = UdpTransport::new(config.clone());
        Self { transport, config }
    }
}

impl<T: Transport> GimbalController<T> {
    pub fn with_transport(config: ControlConfig, transport: T) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open the transport. Reconnecting re-creates it.
    pub fn connect(&mut self) -> Result<()> {
        if self.transport.is_open() {
            debug!("Reconnecting control transport");
            self.transport.close();
        }
        self.transport.open()?;
        info!(
            "Control channel ready for {}:{}",
            self.config.host, self.config.port
        );
        Ok(())
    }

    pub fn disconnect(&mut self) -> Result<()> {
        if !self.transport.is_open() {
            warn!("Control channel already disconnected");
            return Err(ControlError::NotConnected);
        }
        self.transport.close();
        info!("Control channel closed");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    fn dump(&self, label: &str, bytes: &[u8]) {
        if self.config.debug {
            debug!("{}: {}", label, to_hex(bytes));
        } else {
            trace!("{}: {}", label, to_hex(bytes));
        }
    }

    /// Fire a command without waiting for a reply
    pub fn send_command(&mut self, command: Command) -> Result<()> {
        if !self.transport.is_open() {
            return Err(ControlError::NotConnected);
        }
        let frame = command.encode()?;
        self.dump("Encoded msg", &frame);
        self.transport.send(&frame)
    }

    /// One round trip: send `command`, wait for one datagram, return its
    /// verified payload.
    pub fn request(&mut self, command: Command) -> Result<Vec<u8>> {
        let name = command.operation().name();
        self.send_command(command)?;

        let reply = match self.transport.receive() {
            Ok(reply) => reply,
            Err(e @ ControlError::Timeout { .. }) => {
                warn!("Did not get feedback from camera for {}: {}", name, e);
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        self.dump("Server msg", &reply);

        match decode_frame(&reply) {
            Ok(payload) => {
                debug!("{} data: {}", name, to_hex(payload));
                Ok(payload.to_vec())
            }
            Err(e) => {
                error!("{} reply unusable: {}", name, e);
                Err(e.into())
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn firmware_version(&mut self) -> Result<FirmwareVersion> {
        let payload = self.request(Command::AcquireFirmwareVersion)?;
        let version = FirmwareVersion::parse(&payload)?;
        debug!("Firmware version: {}", version);
        Ok(version)
    }

    pub fn hardware_id(&mut self) -> Result<HardwareId> {
        let payload = self.request(Command::AcquireHardwareId)?;
        Ok(HardwareId::parse(&payload)?)
    }

    /// Attitude in degrees and angular rate in degrees/second
    pub fn gimbal_attitude(&mut self) -> Result<Attitude> {
        let payload = self.request(Command::AcquireAttitude)?;
        Ok(Attitude::parse(&payload)?)
    }

    pub fn gimbal_info(&mut self) -> Result<GimbalInfo> {
        let payload = self.request(Command::AcquireGimbalInfo)?;
        Ok(GimbalInfo::parse(&payload)?)
    }

    /// Outcome of the most recent photo/record/mode command
    pub fn function_feedback(&mut self) -> Result<FunctionFeedback> {
        let payload = self.request(Command::FunctionFeedback)?;
        Ok(FunctionFeedback::parse(&payload)?)
    }

    // ========================================================================
    // Lens
    // ========================================================================

    /// Trigger auto focus. `true` when the device acknowledges with 1.
    pub fn auto_focus(&mut self) -> Result<bool> {
        let payload = self.request(Command::AutoFocus)?;
        Ok(parse_ack(&payload)? == 1)
    }

    /// Start or stop manual zoom; returns the zoom factor the device reports
    pub fn set_zoom(&mut self, direction: ZoomDirection) -> Result<f32> {
        let payload = self.request(Command::ManualZoom(direction))?;
        let level = parse_zoom_level(&payload)?;
        debug!("Zoom {:?}, level {:.1}", direction, level);
        Ok(level)
    }

    /// Start or stop manual focus. `true` on any non-zero acknowledgement.
    pub fn set_focus(&mut self, direction: FocusDirection) -> Result<bool> {
        let payload = self.request(Command::ManualFocus(direction))?;
        Ok(parse_ack(&payload)? != 0)
    }

    // ========================================================================
    // Gimbal motion
    // ========================================================================

    /// Return the gimbal to center. `true` when the device acknowledges with 1.
    pub fn center_gimbal(&mut self) -> Result<bool> {
        let payload = self.request(Command::Center)?;
        Ok(parse_ack(&payload)? == 1)
    }

    /// Set yaw/pitch rotation speed, in percent of max speed.
    ///
    /// Values are clamped to `SPEED_RANGE`. Send `(0, 0)` to stop.
    pub fn set_gimbal_speed(&mut self, yaw: i32, pitch: i32) -> Result<bool> {
        let clamp = |v: i32| v.clamp(*SPEED_RANGE.start() as i32, *SPEED_RANGE.end() as i32) as i8;
        let payload = self.request(Command::GimbalRotation {
            yaw: clamp(yaw),
            pitch: clamp(pitch),
        })?;
        Ok(parse_ack(&payload)? == 1)
    }

    // ========================================================================
    // Photo / video / mode
    // ========================================================================
    //
    // The photo/video command is fired without reading a reply; the outcome
    // is read back with a separate function feedback request.

    pub fn take_photo(&mut self) -> Result<bool> {
        self.send_command(Command::PhotoVideo(PhotoAction::TakePhoto))?;

        let feedback = self.function_feedback()?;
        if !feedback.is_success() {
            error!("Could not take photo. Error code: {}", feedback.code());
        }
        Ok(feedback.is_success())
    }

    /// Toggle recording and report the resulting record state
    pub fn toggle_recording(&mut self) -> Result<RecordState> {
        self.send_command(Command::PhotoVideo(PhotoAction::ToggleRecording))?;
        thread::sleep(COMMAND_SETTLE);

        match self.function_feedback() {
            Ok(feedback) if !feedback.is_success() => {
                error!("Error in recording. Check SD card. Code: {}", feedback.code());
                return Err(ControlError::Rejected {
                    operation: "toggle_recording",
                    feedback,
                });
            }
            Ok(_) => {}
            Err(e) if e.is_unknown_result() => {
                warn!("No recording acknowledgement ({}), reading gimbal info", e);
            }
            Err(e) => return Err(e),
        }

        let gimbal = self.gimbal_info()?;
        match gimbal.record_state {
            RecordState::On => info!("Recording is ON"),
            RecordState::Off => info!("Recording is OFF"),
            other => warn!("Record state is unknown: {:?}", other),
        }
        Ok(gimbal.record_state)
    }

    pub fn set_motion_mode(&mut self, mode: MotionMode) -> Result<bool> {
        let action = match mode {
            MotionMode::Lock => PhotoAction::LockMode,
            MotionMode::Follow => PhotoAction::FollowMode,
            MotionMode::Fpv => PhotoAction::FpvMode,
        };
        self.send_command(Command::PhotoVideo(action))?;

        let feedback = self.function_feedback()?;
        if feedback.is_success() {
            info!("{:?} mode is set", mode);
        } else {
            warn!("Could not set {:?} mode. Code: {}", mode, feedback.code());
        }
        Ok(feedback.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gimbal_protocol::{compute_crc16, encode_frame, parse_frame, FrameHeader, ProtocolError};

    use crate::MockTransport;

    /// Device reply frame (CTRL = 0x02)
    fn reply(cmd_id: u8, payload: &[u8]) -> Vec<u8> {
        let mut header = FrameHeader::new(cmd_id, payload.len() as u16);
        header.ctrl = 0x02;
        let mut msg = header.to_bytes().to_vec();
        msg.extend_from_slice(payload);
        let crc = compute_crc16(&msg);
        msg.extend_from_slice(&crc);
        msg
    }

    fn connected() -> (GimbalController<MockTransport>, MockTransport) {
        let mock = MockTransport::new();
        let mut controller =
            GimbalController::with_transport(ControlConfig::default(), mock.clone());
        controller.connect().unwrap();
        (controller, mock)
    }

    #[test]
    fn test_operations_require_connection() {
        let mock = MockTransport::new();
        let mut controller = GimbalController::with_transport(ControlConfig::default(), mock);

        assert!(matches!(
            controller.center_gimbal(),
            Err(ControlError::NotConnected)
        ));
        assert!(matches!(
            controller.disconnect(),
            Err(ControlError::NotConnected)
        ));
    }

    #[test]
    fn test_center_gimbal() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x08, &[0x01]));

        assert!(controller.center_gimbal().unwrap());

        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(to_hex(&sent[0]), "556601010000000801d112");
    }

    #[test]
    fn test_center_gimbal_not_acknowledged() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x08, &[0x00]));
        assert!(!controller.center_gimbal().unwrap());
    }

    #[test]
    fn test_attitude() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(
            0x0d,
            &[0x64, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        ));

        let att = controller.gimbal_attitude().unwrap();
        assert_eq!(att.yaw, 10.0);
        assert_eq!(att.pitch, 0.0);
        assert_eq!(att.roll_rate, 0.0);
    }

    #[test]
    fn test_zoom_level() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x05, &[0x0f, 0x00]));

        assert_eq!(controller.set_zoom(ZoomDirection::In).unwrap(), 1.5);
        assert_eq!(decode_frame(&mock.sent()[0]).unwrap(), &[0x01]);
    }

    #[test]
    fn test_timeout_is_unknown_result() {
        let (mut controller, mock) = connected();
        mock.push_timeout();

        let err = controller.gimbal_attitude().unwrap_err();
        assert!(matches!(err, ControlError::Timeout { .. }));
        assert!(err.is_unknown_result());
        // Still connected: a timeout is not a disconnect
        assert!(controller.is_connected());
    }

    #[test]
    fn test_corrupt_reply_is_unknown_result() {
        let (mut controller, mock) = connected();
        let mut frame = reply(0x08, &[0x01]);
        frame[8] ^= 0x01;
        mock.push_reply(frame);

        let err = controller.center_gimbal().unwrap_err();
        assert!(matches!(
            err,
            ControlError::Protocol(ProtocolError::ChecksumMismatch { .. })
        ));
        assert!(err.is_unknown_result());
    }

    #[test]
    fn test_empty_reply_payload_is_unknown_result() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x08, &[]));

        let err = controller.center_gimbal().unwrap_err();
        assert!(err.is_unknown_result());
    }

    #[test]
    fn test_gimbal_speed_is_clamped() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x07, &[0x01]));

        assert!(controller.set_gimbal_speed(250, -130).unwrap());

        let sent = mock.sent();
        let (header, payload) = parse_frame(&sent[0]).unwrap();
        assert_eq!(header.cmd_id, 0x07);
        assert_eq!(payload, &[100u8, (-100i8) as u8]);
    }

    #[test]
    fn test_stale_reply_is_attributed_to_current_request() {
        // No correlation: whatever arrives next answers the current call
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x05, &[0x01, 0x00]));

        assert!(controller.center_gimbal().unwrap());
        assert_eq!(mock.pending_replies(), 0);
    }

    #[test]
    fn test_take_photo_reads_function_feedback() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x0b, &[0x00]));

        assert!(controller.take_photo().unwrap());

        let sent = mock.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], encode_frame(0x0c, &[0x00]).unwrap());
        assert_eq!(sent[1], encode_frame(0x0b, &[]).unwrap());
    }

    #[test]
    fn test_take_photo_failure_code() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x0b, &[0x01]));
        assert!(!controller.take_photo().unwrap());
    }

    #[test]
    fn test_toggle_recording_reports_state() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x0b, &[0x00]));
        mock.push_reply(reply(0x0a, &[0x00, 0x00, 0x01, 0x01]));

        assert_eq!(controller.toggle_recording().unwrap(), RecordState::On);
        assert_eq!(mock.sent().len(), 3);
    }

    #[test]
    fn test_toggle_recording_rejected() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x0b, &[0x04]));

        let err = controller.toggle_recording().unwrap_err();
        assert!(matches!(
            err,
            ControlError::Rejected {
                feedback: FunctionFeedback::RecordFailed,
                ..
            }
        ));
    }

    #[test]
    fn test_toggle_recording_without_feedback_still_reads_info() {
        let (mut controller, mock) = connected();
        mock.push_timeout();
        mock.push_reply(reply(0x0a, &[0x00, 0x01]));

        assert_eq!(controller.toggle_recording().unwrap(), RecordState::Off);
    }

    #[test]
    fn test_motion_modes() {
        let (mut controller, mock) = connected();
        for (mode, byte) in [
            (MotionMode::Lock, 0x03),
            (MotionMode::Follow, 0x04),
            (MotionMode::Fpv, 0x05),
        ] {
            mock.push_reply(reply(0x0b, &[0x00]));
            assert!(controller.set_motion_mode(mode).unwrap());
            let sent = mock.sent();
            let fired = &sent[sent.len() - 2];
            assert_eq!(decode_frame(fired).unwrap(), &[byte]);
        }
    }

    #[test]
    fn test_firmware_and_hardware_id() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x01, &[0x03, 0x02, 0x01, 0x00, 0x06, 0x05, 0x04, 0x00]));
        mock.push_reply(reply(0x02, &[0x6b, 0x00, 0x01]));

        let fw = controller.firmware_version().unwrap();
        assert_eq!(FirmwareVersion::dotted(fw.gimbal), "4.5.6");
        assert_eq!(controller.hardware_id().unwrap().to_string(), "6b0001");
    }

    #[test]
    fn test_focus_acknowledgements() {
        let (mut controller, mock) = connected();
        mock.push_reply(reply(0x04, &[0x01]));
        mock.push_reply(reply(0x06, &[0x00]));

        assert!(controller.auto_focus().unwrap());
        assert!(!controller.set_focus(FocusDirection::Near).unwrap());
        assert_eq!(decode_frame(&mock.sent()[1]).unwrap(), &[0xff]);
    }

    #[test]
    fn test_reconnect_reopens_transport() {
        let (mut controller, mock) = connected();
        controller.connect().unwrap();
        assert_eq!(mock.open_count(), 2);
        assert!(controller.transport().is_open());

        controller.disconnect().unwrap();
        assert!(!controller.is_connected());
        assert!(!controller.transport().is_open());
    }
}
