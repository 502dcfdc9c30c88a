//! VENDOR DEPENDENT Frames
//!
//! All AVRCP metadata and media-control PDUs travel as AV/C VENDOR
//! DEPENDENT commands under the Bluetooth SIG company id. The header after
//! the three AV/C bytes is: company id (3 bytes), PDU id, packet type and
//! a big-endian parameter length, followed by the PDU parameters.
//!
//! Responses larger than the control MTU arrive fragmented across
//! Start/Continue/End packets; the connection core drives the continuation
//! exchange with [`VendorCommand::request_continuing_response`] and
//! [`VendorCommand::abort_continuing_response`].

use super::{AvcFrame, FrameBuf, PacketError, avc};
use crate::constants::{BT_SIG_COMPANY_ID, MAX_VENDOR_PARAMS};
use crate::notification::NotificationEvent;

/// AVRCP PDU identifiers carried in VENDOR DEPENDENT frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum PduId {
    /// GetCapabilities
    GetCapabilities = 0x10,
    /// ListPlayerApplicationSettingAttributes
    ListPlayerApplicationSettingAttributes = 0x11,
    /// ListPlayerApplicationSettingValues
    ListPlayerApplicationSettingValues = 0x12,
    /// GetCurrentPlayerApplicationSettingValue
    GetCurrentPlayerApplicationSettingValue = 0x13,
    /// SetPlayerApplicationSettingValue
    SetPlayerApplicationSettingValue = 0x14,
    /// GetElementAttributes
    GetElementAttributes = 0x20,
    /// GetPlayStatus
    GetPlayStatus = 0x30,
    /// RegisterNotification
    RegisterNotification = 0x31,
    /// RequestContinuingResponse
    RequestContinuingResponse = 0x40,
    /// AbortContinuingResponse
    AbortContinuingResponse = 0x41,
    /// SetAbsoluteVolume
    SetAbsoluteVolume = 0x50,
    /// SetAddressedPlayer
    SetAddressedPlayer = 0x60,
    /// PlayItem
    PlayItem = 0x74,
    /// AddToNowPlaying
    AddToNowPlaying = 0x90,
}

impl PduId {
    /// Convert from raw PDU id
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x10 => Some(Self::GetCapabilities),
            0x11 => Some(Self::ListPlayerApplicationSettingAttributes),
            0x12 => Some(Self::ListPlayerApplicationSettingValues),
            0x13 => Some(Self::GetCurrentPlayerApplicationSettingValue),
            0x14 => Some(Self::SetPlayerApplicationSettingValue),
            0x20 => Some(Self::GetElementAttributes),
            0x30 => Some(Self::GetPlayStatus),
            0x31 => Some(Self::RegisterNotification),
            0x40 => Some(Self::RequestContinuingResponse),
            0x41 => Some(Self::AbortContinuingResponse),
            0x50 => Some(Self::SetAbsoluteVolume),
            0x60 => Some(Self::SetAddressedPlayer),
            0x74 => Some(Self::PlayItem),
            0x90 => Some(Self::AddToNowPlaying),
            _ => None,
        }
    }
}

/// Fragmentation marker in the vendor header
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum VendorPacketType {
    /// Complete PDU in one frame
    Single = 0x00,
    /// First fragment of a fragmented PDU
    Start = 0x01,
    /// Middle fragment
    Continue = 0x02,
    /// Final fragment
    End = 0x03,
}

impl VendorPacketType {
    /// Convert from the low two bits of the packet type byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Single),
            0x01 => Some(Self::Start),
            0x02 => Some(Self::Continue),
            0x03 => Some(Self::End),
            _ => None,
        }
    }
}

/// Parameter buffer for one vendor PDU
pub type VendorParams = heapless::Vec<u8, MAX_VENDOR_PARAMS>;

/// A VENDOR DEPENDENT command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorCommand {
    /// AV/C command type (CONTROL, STATUS or NOTIFY)
    pub ctype: u8,
    /// PDU id
    pub pdu_id: PduId,
    /// Company identifier, SIG for standard AVRCP PDUs
    pub company_id: u32,
    /// PDU parameters
    pub parameters: VendorParams,
}

impl VendorCommand {
    /// Header length before the parameters
    pub const HEADER_SIZE: usize = 10;

    /// Create a command with the given ctype and parameters
    ///
    /// # Errors
    /// Returns `PacketError::FrameTooLarge` if the parameters exceed the buffer
    pub fn new(ctype: u8, pdu_id: PduId, parameters: &[u8]) -> Result<Self, PacketError> {
        let parameters =
            VendorParams::from_slice(parameters).map_err(|()| PacketError::FrameTooLarge)?;
        Ok(Self {
            ctype,
            pdu_id,
            company_id: BT_SIG_COMPANY_ID,
            parameters,
        })
    }

    fn from_parts(ctype: u8, pdu_id: PduId, parameters: &[u8]) -> Self {
        // Infallible for the fixed-size constructor payloads below
        let mut params = VendorParams::new();
        params.extend_from_slice(parameters).ok();
        Self {
            ctype,
            pdu_id,
            company_id: BT_SIG_COMPANY_ID,
            parameters: params,
        }
    }

    /// GetCapabilities for the given capability id (0x02 company ids,
    /// 0x03 supported events)
    #[must_use]
    pub fn get_capabilities(capability_id: u8) -> Self {
        Self::from_parts(avc::CTYPE_STATUS, PduId::GetCapabilities, &[capability_id])
    }

    /// GetPlayStatus
    #[must_use]
    pub fn get_play_status() -> Self {
        Self::from_parts(avc::CTYPE_STATUS, PduId::GetPlayStatus, &[])
    }

    /// GetElementAttributes for the playing track, requesting all attributes
    #[must_use]
    pub fn get_element_attributes() -> Self {
        // Identifier PLAYING (all zeros), attribute count 0 = all
        Self::from_parts(
            avc::CTYPE_STATUS,
            PduId::GetElementAttributes,
            &[0, 0, 0, 0, 0, 0, 0, 0, 0],
        )
    }

    /// RegisterNotification for an event with the given playback interval
    /// (seconds, only meaningful for `PlaybackPosChanged`)
    #[must_use]
    pub fn register_notification(event: NotificationEvent, playback_interval: u32) -> Self {
        let mut params = [0u8; 5];
        params[0] = event as u8;
        params[1..5].copy_from_slice(&playback_interval.to_be_bytes());
        Self::from_parts(avc::CTYPE_NOTIFY, PduId::RegisterNotification, &params)
    }

    /// RequestContinuingResponse for a fragmented PDU
    #[must_use]
    pub fn request_continuing_response(pdu_id: PduId) -> Self {
        Self::from_parts(
            avc::CTYPE_CONTROL,
            PduId::RequestContinuingResponse,
            &[pdu_id as u8],
        )
    }

    /// AbortContinuingResponse for a fragmented PDU
    #[must_use]
    pub fn abort_continuing_response(pdu_id: PduId) -> Self {
        Self::from_parts(
            avc::CTYPE_CONTROL,
            PduId::AbortContinuingResponse,
            &[pdu_id as u8],
        )
    }

    /// SetAbsoluteVolume (0x00 to 0x7F)
    #[must_use]
    pub fn set_absolute_volume(volume: u8) -> Self {
        Self::from_parts(
            avc::CTYPE_CONTROL,
            PduId::SetAbsoluteVolume,
            &[volume & 0x7F],
        )
    }

    /// SetAddressedPlayer
    #[must_use]
    pub fn set_addressed_player(player_id: u16) -> Self {
        Self::from_parts(
            avc::CTYPE_CONTROL,
            PduId::SetAddressedPlayer,
            &player_id.to_be_bytes(),
        )
    }

    /// PlayItem from the given scope
    #[must_use]
    pub fn play_item(scope: u8, uid: u64, uid_counter: u16) -> Self {
        let mut params = [0u8; 11];
        params[0] = scope;
        params[1..9].copy_from_slice(&uid.to_be_bytes());
        params[9..11].copy_from_slice(&uid_counter.to_be_bytes());
        Self::from_parts(avc::CTYPE_CONTROL, PduId::PlayItem, &params)
    }

    /// AddToNowPlaying from the given scope
    #[must_use]
    pub fn add_to_now_playing(scope: u8, uid: u64, uid_counter: u16) -> Self {
        let mut params = [0u8; 11];
        params[0] = scope;
        params[1..9].copy_from_slice(&uid.to_be_bytes());
        params[9..11].copy_from_slice(&uid_counter.to_be_bytes());
        Self::from_parts(avc::CTYPE_CONTROL, PduId::AddToNowPlaying, &params)
    }
}

impl AvcFrame for VendorCommand {
    fn assemble(&self) -> Result<FrameBuf, PacketError> {
        let mut frame = FrameBuf::new();
        let len = self.parameters.len() as u16;
        frame
            .extend_from_slice(&[
                self.ctype,
                avc::SUBUNIT_PANEL,
                avc::OPCODE_VENDOR,
                (self.company_id >> 16) as u8,
                (self.company_id >> 8) as u8,
                self.company_id as u8,
                self.pdu_id as u8,
                VendorPacketType::Single as u8,
                (len >> 8) as u8,
                len as u8,
            ])
            .map_err(|()| PacketError::FrameTooLarge)?;
        frame
            .extend_from_slice(&self.parameters)
            .map_err(|()| PacketError::FrameTooLarge)?;
        Ok(frame)
    }

    fn disassemble(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() < Self::HEADER_SIZE {
            return Err(PacketError::FrameTooShort);
        }
        if frame[2] != avc::OPCODE_VENDOR {
            return Err(PacketError::MalformedFrame);
        }
        let pdu_id = PduId::from_u8(frame[6]).ok_or(PacketError::MalformedFrame)?;
        let len = usize::from(frame[8]) << 8 | usize::from(frame[9]);
        if frame.len() < Self::HEADER_SIZE + len {
            return Err(PacketError::FrameTooShort);
        }
        let parameters =
            VendorParams::from_slice(&frame[Self::HEADER_SIZE..Self::HEADER_SIZE + len])
                .map_err(|()| PacketError::FrameTooLarge)?;
        Ok(Self {
            ctype: frame[0],
            pdu_id,
            company_id: u32::from(frame[3]) << 16 | u32::from(frame[4]) << 8 | u32::from(frame[5]),
            parameters,
        })
    }
}

/// A VENDOR DEPENDENT response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorResponse {
    /// AV/C response code
    pub response: u8,
    /// PDU id
    pub pdu_id: PduId,
    /// Company identifier
    pub company_id: u32,
    /// Fragmentation marker
    pub packet_type: VendorPacketType,
    /// PDU parameters, possibly a fragment
    pub parameters: VendorParams,
}

impl VendorResponse {
    /// Whether more fragments of this PDU follow
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(
            self.packet_type,
            VendorPacketType::Start | VendorPacketType::Continue
        )
    }
}

impl AvcFrame for VendorResponse {
    fn assemble(&self) -> Result<FrameBuf, PacketError> {
        let mut frame = FrameBuf::new();
        let len = self.parameters.len() as u16;
        frame
            .extend_from_slice(&[
                self.response,
                avc::SUBUNIT_PANEL,
                avc::OPCODE_VENDOR,
                (self.company_id >> 16) as u8,
                (self.company_id >> 8) as u8,
                self.company_id as u8,
                self.pdu_id as u8,
                self.packet_type as u8,
                (len >> 8) as u8,
                len as u8,
            ])
            .map_err(|()| PacketError::FrameTooLarge)?;
        frame
            .extend_from_slice(&self.parameters)
            .map_err(|()| PacketError::FrameTooLarge)?;
        Ok(frame)
    }

    fn disassemble(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() < VendorCommand::HEADER_SIZE {
            return Err(PacketError::FrameTooShort);
        }
        if frame[2] != avc::OPCODE_VENDOR {
            return Err(PacketError::MalformedFrame);
        }
        let pdu_id = PduId::from_u8(frame[6]).ok_or(PacketError::MalformedFrame)?;
        let packet_type =
            VendorPacketType::from_u8(frame[7] & 0x03).ok_or(PacketError::MalformedFrame)?;
        let len = usize::from(frame[8]) << 8 | usize::from(frame[9]);
        if frame.len() < VendorCommand::HEADER_SIZE + len {
            return Err(PacketError::FrameTooShort);
        }
        let parameters = VendorParams::from_slice(
            &frame[VendorCommand::HEADER_SIZE..VendorCommand::HEADER_SIZE + len],
        )
        .map_err(|()| PacketError::FrameTooLarge)?;
        Ok(Self {
            response: frame[0],
            pdu_id,
            company_id: u32::from(frame[3]) << 16 | u32::from(frame[4]) << 8 | u32::from(frame[5]),
            packet_type,
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_capabilities_assemble() {
        let frame = VendorCommand::get_capabilities(0x03).assemble().unwrap();
        assert_eq!(
            &frame[..],
            &[0x01, 0x48, 0x00, 0x00, 0x19, 0x58, 0x10, 0x00, 0x00, 0x01, 0x03]
        );
    }

    #[test]
    fn test_register_notification_assemble() {
        let cmd = VendorCommand::register_notification(NotificationEvent::VolumeChanged, 0);
        let frame = cmd.assemble().unwrap();
        assert_eq!(frame[0], avc::CTYPE_NOTIFY);
        assert_eq!(frame[6], 0x31);
        assert_eq!(frame[9], 5);
        assert_eq!(frame[10], 0x0D);
    }

    #[test]
    fn test_set_absolute_volume_clamps() {
        let cmd = VendorCommand::set_absolute_volume(0xFF);
        assert_eq!(&cmd.parameters[..], &[0x7F]);
    }

    #[test]
    fn test_command_roundtrip() {
        let cmd = VendorCommand::play_item(0x03, 0x0102_0304_0506_0708, 0x0A0B);
        let frame = cmd.assemble().unwrap();
        let parsed = VendorCommand::disassemble(&frame).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn test_response_fragmentation_flags() {
        let mut frame = [0x0C, 0x48, 0x00, 0x00, 0x19, 0x58, 0x20, 0x01, 0x00, 0x02, 0xAA, 0xBB];
        let resp = VendorResponse::disassemble(&frame).unwrap();
        assert_eq!(resp.packet_type, VendorPacketType::Start);
        assert!(resp.is_partial());
        assert_eq!(&resp.parameters[..], &[0xAA, 0xBB]);

        frame[7] = 0x03;
        let resp = VendorResponse::disassemble(&frame).unwrap();
        assert_eq!(resp.packet_type, VendorPacketType::End);
        assert!(!resp.is_partial());
    }

    #[test]
    fn test_malformed_frames() {
        // truncated header
        assert_eq!(
            VendorResponse::disassemble(&[0x0C, 0x48, 0x00]),
            Err(PacketError::FrameTooShort)
        );
        // declared length exceeds frame
        assert_eq!(
            VendorResponse::disassemble(&[
                0x0C, 0x48, 0x00, 0x00, 0x19, 0x58, 0x30, 0x00, 0x00, 0x09
            ]),
            Err(PacketError::FrameTooShort)
        );
        // unknown pdu id
        assert_eq!(
            VendorResponse::disassemble(&[
                0x0C, 0x48, 0x00, 0x00, 0x19, 0x58, 0xEE, 0x00, 0x00, 0x00
            ]),
            Err(PacketError::MalformedFrame)
        );
    }
}
