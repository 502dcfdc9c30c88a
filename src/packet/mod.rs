//! AVRCP Packet Contracts
//!
//! Frame types for the four AVRCP command categories. The connection and
//! state-machine core only depends on two operations per category:
//! [`AvcFrame::assemble`] to produce the on-wire bytes and
//! [`AvcFrame::disassemble`] to parse an inbound frame. Full field layouts
//! beyond the headers the core needs (classification, PDU ids, fragmentation
//! flags) belong to the profile layer above.

pub mod browse;
pub mod pass_through;
pub mod unit_info;
pub mod vendor;

pub use browse::{BrowseCommand, BrowsePdu, BrowseResponse};
pub use pass_through::{KeyState, PassThroughCommand, PassThroughOperation, PassThroughResponse};
pub use unit_info::{UnitInfoCommand, UnitInfoKind, UnitInfoResponse};
pub use vendor::{PduId, VendorCommand, VendorPacketType, VendorResponse};

use crate::constants::MAX_FRAME_LEN;

/// Assembled frame buffer
pub type FrameBuf = heapless::Vec<u8, MAX_FRAME_LEN>;

/// Packet assembly/parsing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum PacketError {
    /// Inbound frame shorter than the category header
    FrameTooShort,
    /// Frame header fields do not match the category layout
    MalformedFrame,
    /// Assembled frame does not fit the frame buffer
    FrameTooLarge,
}

/// AV/C protocol constants shared by the control-channel categories
pub mod avc {
    /// CONTROL command type
    pub const CTYPE_CONTROL: u8 = 0x00;
    /// STATUS command type
    pub const CTYPE_STATUS: u8 = 0x01;
    /// NOTIFY command type
    pub const CTYPE_NOTIFY: u8 = 0x03;

    /// ACCEPTED response code
    pub const RESPONSE_ACCEPTED: u8 = 0x09;
    /// REJECTED response code
    pub const RESPONSE_REJECTED: u8 = 0x0A;
    /// STABLE/IMPLEMENTED response code
    pub const RESPONSE_IMPLEMENTED: u8 = 0x0C;
    /// CHANGED response code
    pub const RESPONSE_CHANGED: u8 = 0x0D;
    /// INTERIM response code
    pub const RESPONSE_INTERIM: u8 = 0x0F;

    /// Panel subunit (type 0x09, id 0)
    pub const SUBUNIT_PANEL: u8 = 0x48;
    /// Unit address used by UNIT INFO
    pub const SUBUNIT_UNIT: u8 = 0xFF;

    /// VENDOR DEPENDENT opcode
    pub const OPCODE_VENDOR: u8 = 0x00;
    /// UNIT INFO opcode
    pub const OPCODE_UNIT_INFO: u8 = 0x30;
    /// SUB UNIT INFO opcode
    pub const OPCODE_SUB_UNIT_INFO: u8 = 0x31;
    /// PASS THROUGH opcode
    pub const OPCODE_PASS_THROUGH: u8 = 0x7C;
}

/// AVRCP command categories
///
/// Each category owns one slot per connection (timer, in-flight packet,
/// FIFO queue) and at most one command may be outstanding per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum CommandCategory {
    /// PASS THROUGH key-press style transport controls
    PassThrough,
    /// UNIT INFO / SUB UNIT INFO identification exchange
    UnitInfo,
    /// VENDOR DEPENDENT media-control and metadata operations
    Vendor,
    /// BROWSING operations on the browse channel
    Browse,
}

impl CommandCategory {
    /// Classify an inbound control-channel frame by its AV/C opcode
    ///
    /// Browse frames arrive on their own channel and are never classified
    /// here. Returns `None` for frames too short to carry an opcode or with
    /// an opcode outside the AVRCP set.
    #[must_use]
    pub fn classify_control(frame: &[u8]) -> Option<Self> {
        let opcode = *frame.get(2)?;
        match opcode {
            avc::OPCODE_PASS_THROUGH => Some(Self::PassThrough),
            avc::OPCODE_UNIT_INFO | avc::OPCODE_SUB_UNIT_INFO => Some(Self::UnitInfo),
            avc::OPCODE_VENDOR => Some(Self::Vendor),
            _ => None,
        }
    }
}

/// The two operations the connection core depends on from a packet type
pub trait AvcFrame: Sized {
    /// Produce the on-wire byte layout
    ///
    /// # Errors
    /// Returns `PacketError::FrameTooLarge` if the frame does not fit the buffer
    fn assemble(&self) -> Result<FrameBuf, PacketError>;

    /// Parse an inbound frame
    ///
    /// # Errors
    /// Returns a `PacketError` if the frame is not well-formed
    fn disassemble(frame: &[u8]) -> Result<Self, PacketError>;
}

/// A command from any category, as stored in the per-category slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvrcpCommand {
    /// PASS THROUGH command
    PassThrough(PassThroughCommand),
    /// UNIT INFO / SUB UNIT INFO command
    UnitInfo(UnitInfoCommand),
    /// VENDOR DEPENDENT command
    Vendor(VendorCommand),
    /// BROWSING command
    Browse(BrowseCommand),
}

impl AvrcpCommand {
    /// The category slot this command belongs to
    #[must_use]
    pub fn category(&self) -> CommandCategory {
        match self {
            Self::PassThrough(_) => CommandCategory::PassThrough,
            Self::UnitInfo(_) => CommandCategory::UnitInfo,
            Self::Vendor(_) => CommandCategory::Vendor,
            Self::Browse(_) => CommandCategory::Browse,
        }
    }

    /// Assemble the wrapped command into its on-wire layout
    ///
    /// # Errors
    /// Returns a `PacketError` if assembly fails
    pub fn assemble(&self) -> Result<FrameBuf, PacketError> {
        match self {
            Self::PassThrough(cmd) => cmd.assemble(),
            Self::UnitInfo(cmd) => cmd.assemble(),
            Self::Vendor(cmd) => cmd.assemble(),
            Self::Browse(cmd) => cmd.assemble(),
        }
    }
}

impl From<PassThroughCommand> for AvrcpCommand {
    fn from(cmd: PassThroughCommand) -> Self {
        Self::PassThrough(cmd)
    }
}

impl From<UnitInfoCommand> for AvrcpCommand {
    fn from(cmd: UnitInfoCommand) -> Self {
        Self::UnitInfo(cmd)
    }
}

impl From<VendorCommand> for AvrcpCommand {
    fn from(cmd: VendorCommand) -> Self {
        Self::Vendor(cmd)
    }
}

impl From<BrowseCommand> for AvrcpCommand {
    fn from(cmd: BrowseCommand) -> Self {
        Self::Browse(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_control() {
        let pass = PassThroughCommand::new(PassThroughOperation::Play, KeyState::Pressed)
            .assemble()
            .unwrap();
        assert_eq!(
            CommandCategory::classify_control(&pass),
            Some(CommandCategory::PassThrough)
        );

        let unit = UnitInfoCommand::new(UnitInfoKind::Unit).assemble().unwrap();
        assert_eq!(
            CommandCategory::classify_control(&unit),
            Some(CommandCategory::UnitInfo)
        );

        let vendor = VendorCommand::get_play_status().assemble().unwrap();
        assert_eq!(
            CommandCategory::classify_control(&vendor),
            Some(CommandCategory::Vendor)
        );

        assert_eq!(CommandCategory::classify_control(&[0x00, 0x48]), None);
        assert_eq!(CommandCategory::classify_control(&[0x00, 0x48, 0x55]), None);
    }

    #[test]
    fn test_command_category_mapping() {
        let cmd: AvrcpCommand =
            PassThroughCommand::new(PassThroughOperation::Pause, KeyState::Pressed).into();
        assert_eq!(cmd.category(), CommandCategory::PassThrough);

        let cmd: AvrcpCommand = VendorCommand::get_capabilities(0x03).into();
        assert_eq!(cmd.category(), CommandCategory::Vendor);

        let cmd: AvrcpCommand = BrowseCommand::change_path(0, 1, None).into();
        assert_eq!(cmd.category(), CommandCategory::Browse);
    }
}
