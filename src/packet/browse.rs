//! BROWSING Frames
//!
//! Browse commands travel on the dedicated AVCTP browse channel and skip
//! the AV/C header entirely: one PDU id byte, a big-endian parameter
//! length, then the parameters. Browse PDUs are never fragmented; the
//! browse MTU bounds the whole frame.

use super::{AvcFrame, FrameBuf, PacketError};
use crate::constants::MAX_VENDOR_PARAMS;

/// Browse channel PDU identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum BrowsePdu {
    /// SetBrowsedPlayer
    SetBrowsedPlayer = 0x70,
    /// GetFolderItems
    GetFolderItems = 0x71,
    /// ChangePath
    ChangePath = 0x72,
    /// GetItemAttributes
    GetItemAttributes = 0x73,
    /// GetTotalNumberOfItems
    GetTotalNumberOfItems = 0x75,
}

impl BrowsePdu {
    /// Convert from raw PDU id
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x70 => Some(Self::SetBrowsedPlayer),
            0x71 => Some(Self::GetFolderItems),
            0x72 => Some(Self::ChangePath),
            0x73 => Some(Self::GetItemAttributes),
            0x75 => Some(Self::GetTotalNumberOfItems),
            _ => None,
        }
    }
}

/// Parameter buffer for one browse PDU
pub type BrowseParams = heapless::Vec<u8, MAX_VENDOR_PARAMS>;

/// Folder navigation direction for ChangePath
pub mod direction {
    /// Navigate up to the parent folder
    pub const FOLDER_UP: u8 = 0x00;
    /// Navigate down into a child folder
    pub const FOLDER_DOWN: u8 = 0x01;
}

/// A browse channel command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseCommand {
    /// PDU id
    pub pdu: BrowsePdu,
    /// PDU parameters
    pub parameters: BrowseParams,
}

impl BrowseCommand {
    /// Header length before the parameters
    pub const HEADER_SIZE: usize = 3;

    /// Create a command with the given parameters
    ///
    /// # Errors
    /// Returns `PacketError::FrameTooLarge` if the parameters exceed the buffer
    pub fn new(pdu: BrowsePdu, parameters: &[u8]) -> Result<Self, PacketError> {
        let parameters =
            BrowseParams::from_slice(parameters).map_err(|()| PacketError::FrameTooLarge)?;
        Ok(Self { pdu, parameters })
    }

    fn from_parts(pdu: BrowsePdu, parameters: &[u8]) -> Self {
        let mut params = BrowseParams::new();
        params.extend_from_slice(parameters).ok();
        Self {
            pdu,
            parameters: params,
        }
    }

    /// SetBrowsedPlayer
    #[must_use]
    pub fn set_browsed_player(player_id: u16) -> Self {
        Self::from_parts(BrowsePdu::SetBrowsedPlayer, &player_id.to_be_bytes())
    }

    /// GetFolderItems over an item range in the given scope
    #[must_use]
    pub fn get_folder_items(scope: u8, start: u32, end: u32) -> Self {
        let mut params = [0u8; 10];
        params[0] = scope;
        params[1..5].copy_from_slice(&start.to_be_bytes());
        params[5..9].copy_from_slice(&end.to_be_bytes());
        // attribute count 0 = all attributes
        params[9] = 0;
        Self::from_parts(BrowsePdu::GetFolderItems, &params)
    }

    /// ChangePath up or (given a folder uid) down
    #[must_use]
    pub fn change_path(uid_counter: u16, dir: u8, folder_uid: Option<u64>) -> Self {
        let mut params = [0u8; 11];
        params[0..2].copy_from_slice(&uid_counter.to_be_bytes());
        params[2] = dir;
        params[3..11].copy_from_slice(&folder_uid.unwrap_or(0).to_be_bytes());
        Self::from_parts(BrowsePdu::ChangePath, &params)
    }

    /// GetTotalNumberOfItems in the given scope
    #[must_use]
    pub fn get_total_number_of_items(scope: u8) -> Self {
        Self::from_parts(BrowsePdu::GetTotalNumberOfItems, &[scope])
    }
}

impl AvcFrame for BrowseCommand {
    fn assemble(&self) -> Result<FrameBuf, PacketError> {
        let mut frame = FrameBuf::new();
        let len = self.parameters.len() as u16;
        frame
            .extend_from_slice(&[self.pdu as u8, (len >> 8) as u8, len as u8])
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
        let pdu = BrowsePdu::from_u8(frame[0]).ok_or(PacketError::MalformedFrame)?;
        let len = usize::from(frame[1]) << 8 | usize::from(frame[2]);
        if frame.len() < Self::HEADER_SIZE + len {
            return Err(PacketError::FrameTooShort);
        }
        let parameters =
            BrowseParams::from_slice(&frame[Self::HEADER_SIZE..Self::HEADER_SIZE + len])
                .map_err(|()| PacketError::FrameTooLarge)?;
        Ok(Self { pdu, parameters })
    }
}

/// A browse channel response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseResponse {
    /// PDU id
    pub pdu: BrowsePdu,
    /// PDU parameters, starting with the status byte
    pub parameters: BrowseParams,
}

impl BrowseResponse {
    /// Browse status byte, present as the first parameter of every response
    #[must_use]
    pub fn status(&self) -> Option<u8> {
        self.parameters.first().copied()
    }
}

impl AvcFrame for BrowseResponse {
    fn assemble(&self) -> Result<FrameBuf, PacketError> {
        let mut frame = FrameBuf::new();
        let len = self.parameters.len() as u16;
        frame
            .extend_from_slice(&[self.pdu as u8, (len >> 8) as u8, len as u8])
            .map_err(|()| PacketError::FrameTooLarge)?;
        frame
            .extend_from_slice(&self.parameters)
            .map_err(|()| PacketError::FrameTooLarge)?;
        Ok(frame)
    }

    fn disassemble(frame: &[u8]) -> Result<Self, PacketError> {
        let cmd = BrowseCommand::disassemble(frame)?;
        Ok(Self {
            pdu: cmd.pdu,
            parameters: cmd.parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_path_assemble() {
        let cmd = BrowseCommand::change_path(0x0001, direction::FOLDER_DOWN, Some(0x42));
        let frame = cmd.assemble().unwrap();
        assert_eq!(frame[0], 0x72);
        assert_eq!(&frame[1..3], &[0x00, 0x0B]);
        assert_eq!(&frame[3..5], &[0x00, 0x01]);
        assert_eq!(frame[5], 0x01);
        assert_eq!(frame[13], 0x42);
    }

    #[test]
    fn test_change_path_up_zeroes_uid() {
        let cmd = BrowseCommand::change_path(0, direction::FOLDER_UP, None);
        assert_eq!(&cmd.parameters[3..11], &[0; 8]);
    }

    #[test]
    fn test_command_roundtrip() {
        let cmd = BrowseCommand::get_folder_items(0x01, 0, 24);
        let frame = cmd.assemble().unwrap();
        let parsed = BrowseCommand::disassemble(&frame).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn test_response_status() {
        // SetBrowsedPlayer response, status 0x04 (operation completed)
        let frame = [0x70, 0x00, 0x01, 0x04];
        let resp = BrowseResponse::disassemble(&frame).unwrap();
        assert_eq!(resp.status(), Some(0x04));
    }

    #[test]
    fn test_malformed_frames() {
        assert_eq!(
            BrowseCommand::disassemble(&[0x71]),
            Err(PacketError::FrameTooShort)
        );
        assert_eq!(
            BrowseCommand::disassemble(&[0xEE, 0x00, 0x00]),
            Err(PacketError::MalformedFrame)
        );
        assert_eq!(
            BrowseCommand::disassemble(&[0x71, 0x00, 0x05, 0x01]),
            Err(PacketError::FrameTooShort)
        );
    }
}
