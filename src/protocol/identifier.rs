//! CAN-style identifier decomposition
//!
//! ```text
//!  31      29 28                               11 10         7 6           0
//! +----------+-----------------------------------+------------+-------------+
//! | reserved |          extended id (18)         | func (4)   | node id (7) |
//! +----------+-----------------------------------+------------+-------------+
//! ```

use std::fmt;

use super::FunctionCode;

const NODE_ID_BITS: u32 = 7;
const FUNCTION_CODE_BITS: u32 = 4;
const EXTENDED_ID_BITS: u32 = 18;

const NODE_ID_MASK: u32 = (1 << NODE_ID_BITS) - 1;
const FUNCTION_CODE_SHIFT: u32 = NODE_ID_BITS;
const FUNCTION_CODE_MASK: u32 = (1 << FUNCTION_CODE_BITS) - 1;
const EXTENDED_ID_SHIFT: u32 = NODE_ID_BITS + FUNCTION_CODE_BITS;
const EXTENDED_ID_MASK: u32 = (1 << EXTENDED_ID_BITS) - 1;

/// Identifier fields carried in the low 29 bits of an inbound id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanIdentifier {
    node_id: u8,
    function_code: u8,
    extended_id: u32,
}

impl CanIdentifier {
    /// Decompose a raw identifier. Bits above the extended id are ignored.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self {
            node_id: (id & NODE_ID_MASK) as u8,
            function_code: ((id >> FUNCTION_CODE_SHIFT) & FUNCTION_CODE_MASK) as u8,
            extended_id: (id >> EXTENDED_ID_SHIFT) & EXTENDED_ID_MASK,
        }
    }

    /// Compose an identifier, masking each field to its width.
    #[must_use]
    pub const fn new(node_id: u8, function_code: u8, extended_id: u32) -> Self {
        Self {
            node_id: node_id & NODE_ID_MASK as u8,
            function_code: function_code & FUNCTION_CODE_MASK as u8,
            extended_id: extended_id & EXTENDED_ID_MASK,
        }
    }

    /// Raw 32-bit form
    #[must_use]
    pub const fn to_raw(self) -> u32 {
        self.node_id as u32
            | (self.function_code as u32) << FUNCTION_CODE_SHIFT
            | self.extended_id << EXTENDED_ID_SHIFT
    }

    /// Sending node (7 bits)
    #[must_use]
    pub const fn node_id(self) -> u8 {
        self.node_id
    }

    /// Raw function code (4 bits)
    #[must_use]
    pub const fn function_code(self) -> u8 {
        self.function_code
    }

    /// Known function, if the code is assigned
    #[must_use]
    pub fn function(self) -> Option<FunctionCode> {
        FunctionCode::from_u8(self.function_code)
    }

    /// Extended id (18 bits); the frame index for transmit-data messages
    #[must_use]
    pub const fn extended_id(self) -> u32 {
        self.extended_id
    }
}

impl From<u32> for CanIdentifier {
    fn from(id: u32) -> Self {
        Self::from_raw(id)
    }
}

impl fmt::Display for CanIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node={:#04x} func={:#x} ext={:#07x}",
            self.node_id, self.function_code, self.extended_id
        )
    }
}
