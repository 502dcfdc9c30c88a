//! UNIT INFO / SUB UNIT INFO Frames
//!
//! Basic AV/C device identification exchange. Both variants share one
//! category slot: at most one identification command is outstanding at a
//! time regardless of variant.

use super::{AvcFrame, FrameBuf, PacketError, avc};

/// Which identification command to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum UnitInfoKind {
    /// UNIT INFO (opcode 0x30)
    Unit,
    /// SUB UNIT INFO (opcode 0x31)
    SubUnit,
}

/// A UNIT INFO or SUB UNIT INFO command frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct UnitInfoCommand {
    /// Command variant
    pub kind: UnitInfoKind,
}

impl UnitInfoCommand {
    /// Frame size in bytes
    pub const SIZE: usize = 8;

    /// Create a new identification command
    #[must_use]
    pub const fn new(kind: UnitInfoKind) -> Self {
        Self { kind }
    }

    const fn opcode(&self) -> u8 {
        match self.kind {
            UnitInfoKind::Unit => avc::OPCODE_UNIT_INFO,
            UnitInfoKind::SubUnit => avc::OPCODE_SUB_UNIT_INFO,
        }
    }
}

impl AvcFrame for UnitInfoCommand {
    fn assemble(&self) -> Result<FrameBuf, PacketError> {
        let mut frame = FrameBuf::new();
        // SUB UNIT INFO addresses page 0 with extension code 0x7 in the
        // first operand; UNIT INFO pads all operands with 0xFF.
        let operand0 = match self.kind {
            UnitInfoKind::Unit => 0xFF,
            UnitInfoKind::SubUnit => 0x07,
        };
        frame
            .extend_from_slice(&[
                avc::CTYPE_STATUS,
                avc::SUBUNIT_UNIT,
                self.opcode(),
                operand0,
                0xFF,
                0xFF,
                0xFF,
                0xFF,
            ])
            .map_err(|()| PacketError::FrameTooLarge)?;
        Ok(frame)
    }

    fn disassemble(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() < Self::SIZE {
            return Err(PacketError::FrameTooShort);
        }
        let kind = match frame[2] {
            avc::OPCODE_UNIT_INFO => UnitInfoKind::Unit,
            avc::OPCODE_SUB_UNIT_INFO => UnitInfoKind::SubUnit,
            _ => return Err(PacketError::MalformedFrame),
        };
        Ok(Self { kind })
    }
}

/// A UNIT INFO response frame carrying the peer's identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct UnitInfoResponse {
    /// AV/C response code
    pub response: u8,
    /// Unit type (panel = 0x09)
    pub unit_type: u8,
    /// Unit id
    pub unit: u8,
    /// Peer's SIG company identifier
    pub company_id: u32,
}

impl AvcFrame for UnitInfoResponse {
    fn assemble(&self) -> Result<FrameBuf, PacketError> {
        let mut frame = FrameBuf::new();
        frame
            .extend_from_slice(&[
                self.response,
                avc::SUBUNIT_UNIT,
                avc::OPCODE_UNIT_INFO,
                0x07,
                self.unit_type << 3 | (self.unit & 0x07),
                (self.company_id >> 16) as u8,
                (self.company_id >> 8) as u8,
                self.company_id as u8,
            ])
            .map_err(|()| PacketError::FrameTooLarge)?;
        Ok(frame)
    }

    fn disassemble(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() < UnitInfoCommand::SIZE {
            return Err(PacketError::FrameTooShort);
        }
        if frame[2] != avc::OPCODE_UNIT_INFO {
            return Err(PacketError::MalformedFrame);
        }
        Ok(Self {
            response: frame[0],
            unit_type: frame[4] >> 3,
            unit: frame[4] & 0x07,
            company_id: u32::from(frame[5]) << 16 | u32::from(frame[6]) << 8 | u32::from(frame[7]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_info_assemble() {
        let frame = UnitInfoCommand::new(UnitInfoKind::Unit).assemble().unwrap();
        assert_eq!(
            &frame[..],
            &[0x01, 0xFF, 0x30, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_sub_unit_info_assemble() {
        let frame = UnitInfoCommand::new(UnitInfoKind::SubUnit)
            .assemble()
            .unwrap();
        assert_eq!(
            &frame[..],
            &[0x01, 0xFF, 0x31, 0x07, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_response_roundtrip() {
        let resp = UnitInfoResponse {
            response: avc::RESPONSE_IMPLEMENTED,
            unit_type: 0x09,
            unit: 0x00,
            company_id: 0x00_1958,
        };
        let frame = resp.assemble().unwrap();
        let parsed = UnitInfoResponse::disassemble(&frame).unwrap();
        assert_eq!(parsed, resp);
    }

    #[test]
    fn test_malformed() {
        assert_eq!(
            UnitInfoCommand::disassemble(&[0x01, 0xFF]),
            Err(PacketError::FrameTooShort)
        );
        assert_eq!(
            UnitInfoCommand::disassemble(&[0x01, 0xFF, 0x7C, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]),
            Err(PacketError::MalformedFrame)
        );
    }
}
