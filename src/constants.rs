//! `avrcp-ct` Constants
//!
//! This module contains the constants used throughout the library: capacity
//! bounds for the heapless containers, AVCTP channel parameters, and the
//! default command timing.

use embassy_time::Duration;

/// Maximum number of simultaneous AVRCP connections (must be a power of two)
pub const MAX_CONNECTIONS: usize = 8;

/// Maximum number of queued-but-unsent commands per category slot
pub const MAX_PENDING_COMMANDS: usize = 8;

/// Maximum assembled AV/C or browse frame length in bytes
pub const MAX_FRAME_LEN: usize = 512;

/// Maximum number of VENDOR DEPENDENT parameter bytes carried in one command
pub const MAX_VENDOR_PARAMS: usize = 255;

/// Maximum number of side-effect actions one state dispatch can produce
pub const MAX_ACTIONS: usize = 2;

/// L2CAP PSM for the AVCTP control channel
pub const AVCT_CONTROL_PSM: u16 = 0x0017;

/// L2CAP PSM for the AVCTP browse channel
pub const AVCT_BROWSE_PSM: u16 = 0x001B;

/// Default control channel MTU (L2CAP default)
pub const DEFAULT_CONTROL_MTU: u16 = 672;

/// Default browse channel MTU
pub const DEFAULT_BROWSE_MTU: u16 = 1024;

/// Bluetooth SIG company identifier used in VENDOR DEPENDENT frames
pub const BT_SIG_COMPANY_ID: u32 = 0x00_1958;

/// Default response timeout for an in-flight command
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Depth of the service request/event channels
pub const CHANNEL_DEPTH: usize = 8;

/// How often the service task sweeps the response timers
pub const TIMER_POLL_INTERVAL: Duration = Duration::from_millis(100);
