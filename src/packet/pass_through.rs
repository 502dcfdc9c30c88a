//! PASS THROUGH Frames
//!
//! PASS THROUGH carries key-press/release style transport controls. The
//! frame is a fixed five-byte AV/C layout: ctype, panel subunit, opcode
//! 0x7C, operation id with the state flag in the top bit, and a zero
//! operation data length.

use super::{AvcFrame, FrameBuf, PacketError, avc};

/// PASS THROUGH operation identifiers (AV/C panel subunit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum PassThroughOperation {
    /// Volume up
    VolumeUp = 0x41,
    /// Volume down
    VolumeDown = 0x42,
    /// Mute
    Mute = 0x43,
    /// Play
    Play = 0x44,
    /// Stop
    Stop = 0x45,
    /// Pause
    Pause = 0x46,
    /// Rewind
    Rewind = 0x48,
    /// Fast forward
    FastForward = 0x49,
    /// Forward (next track)
    Forward = 0x4B,
    /// Backward (previous track)
    Backward = 0x4C,
}

impl PassThroughOperation {
    /// Convert from raw operation id
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x41 => Some(Self::VolumeUp),
            0x42 => Some(Self::VolumeDown),
            0x43 => Some(Self::Mute),
            0x44 => Some(Self::Play),
            0x45 => Some(Self::Stop),
            0x46 => Some(Self::Pause),
            0x48 => Some(Self::Rewind),
            0x49 => Some(Self::FastForward),
            0x4B => Some(Self::Forward),
            0x4C => Some(Self::Backward),
            _ => None,
        }
    }
}

/// Key state carried in the top bit of the operation byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum KeyState {
    /// Key pressed
    Pressed = 0x00,
    /// Key released
    Released = 0x01,
}

/// A PASS THROUGH command frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct PassThroughCommand {
    /// Operation id
    pub operation: PassThroughOperation,
    /// Press or release
    pub key_state: KeyState,
}

impl PassThroughCommand {
    /// Frame size in bytes
    pub const SIZE: usize = 5;

    /// Create a new PASS THROUGH command
    #[must_use]
    pub const fn new(operation: PassThroughOperation, key_state: KeyState) -> Self {
        Self {
            operation,
            key_state,
        }
    }
}

impl AvcFrame for PassThroughCommand {
    fn assemble(&self) -> Result<FrameBuf, PacketError> {
        let mut frame = FrameBuf::new();
        frame
            .extend_from_slice(&[
                avc::CTYPE_CONTROL,
                avc::SUBUNIT_PANEL,
                avc::OPCODE_PASS_THROUGH,
                (self.key_state as u8) << 7 | self.operation as u8,
                0x00,
            ])
            .map_err(|()| PacketError::FrameTooLarge)?;
        Ok(frame)
    }

    fn disassemble(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() < Self::SIZE {
            return Err(PacketError::FrameTooShort);
        }
        if frame[2] != avc::OPCODE_PASS_THROUGH {
            return Err(PacketError::MalformedFrame);
        }
        let operation =
            PassThroughOperation::from_u8(frame[3] & 0x7F).ok_or(PacketError::MalformedFrame)?;
        let key_state = if frame[3] & 0x80 == 0 {
            KeyState::Pressed
        } else {
            KeyState::Released
        };
        Ok(Self {
            operation,
            key_state,
        })
    }
}

/// A PASS THROUGH response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct PassThroughResponse {
    /// AV/C response code (ACCEPTED, REJECTED, ...)
    pub response: u8,
    /// Echoed operation id
    pub operation: PassThroughOperation,
    /// Echoed key state
    pub key_state: KeyState,
}

impl PassThroughResponse {
    /// Whether the target accepted the operation
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        self.response == avc::RESPONSE_ACCEPTED
    }
}

impl AvcFrame for PassThroughResponse {
    fn assemble(&self) -> Result<FrameBuf, PacketError> {
        let mut frame = FrameBuf::new();
        frame
            .extend_from_slice(&[
                self.response,
                avc::SUBUNIT_PANEL,
                avc::OPCODE_PASS_THROUGH,
                (self.key_state as u8) << 7 | self.operation as u8,
                0x00,
            ])
            .map_err(|()| PacketError::FrameTooLarge)?;
        Ok(frame)
    }

    fn disassemble(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() < PassThroughCommand::SIZE {
            return Err(PacketError::FrameTooShort);
        }
        if frame[2] != avc::OPCODE_PASS_THROUGH {
            return Err(PacketError::MalformedFrame);
        }
        let operation =
            PassThroughOperation::from_u8(frame[3] & 0x7F).ok_or(PacketError::MalformedFrame)?;
        let key_state = if frame[3] & 0x80 == 0 {
            KeyState::Pressed
        } else {
            KeyState::Released
        };
        Ok(Self {
            response: frame[0],
            operation,
            key_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_assemble() {
        let cmd = PassThroughCommand::new(PassThroughOperation::Play, KeyState::Pressed);
        let frame = cmd.assemble().unwrap();
        assert_eq!(&frame[..], &[0x00, 0x48, 0x7C, 0x44, 0x00]);

        let released = PassThroughCommand::new(PassThroughOperation::Play, KeyState::Released);
        let frame = released.assemble().unwrap();
        assert_eq!(frame[3], 0xC4);
    }

    #[test]
    fn test_command_disassemble() {
        let cmd = PassThroughCommand::new(PassThroughOperation::Pause, KeyState::Released);
        let frame = cmd.assemble().unwrap();
        let parsed = PassThroughCommand::disassemble(&frame).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn test_response_disassemble() {
        let frame = [0x09, 0x48, 0x7C, 0x44, 0x00];
        let resp = PassThroughResponse::disassemble(&frame).unwrap();
        assert!(resp.is_accepted());
        assert_eq!(resp.operation, PassThroughOperation::Play);
        assert_eq!(resp.key_state, KeyState::Pressed);
    }

    #[test]
    fn test_malformed_frames() {
        assert_eq!(
            PassThroughCommand::disassemble(&[0x00, 0x48]),
            Err(PacketError::FrameTooShort)
        );
        // wrong opcode
        assert_eq!(
            PassThroughCommand::disassemble(&[0x00, 0x48, 0x30, 0x44, 0x00]),
            Err(PacketError::MalformedFrame)
        );
        // unknown operation id
        assert_eq!(
            PassThroughCommand::disassemble(&[0x00, 0x48, 0x7C, 0x7F, 0x00]),
            Err(PacketError::MalformedFrame)
        );
    }
}
