use std::fmt;

/// Content type code.
///
/// Conventional codes are bit patterns: bit 0 human-readable text, bit 1
/// visual, bit 2 audible, bit 3 machine-directed, bit 4 payload elsewhere,
/// bit 5 third-party content, bit 6 digital value, bit 7 system generated.
/// The bits are advisory and never enforced; any 32-bit value is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentType(pub u32);

impl ContentType {
    pub const ANY: Self = Self(0x00);
    pub const TEXT: Self = Self(0x01);

    pub const FILE: Self = Self(0x10);
    pub const IMAGE: Self = Self(0x12);
    pub const AUDIO: Self = Self(0x14);
    pub const VIDEO: Self = Self(0x16);

    pub const PAGE: Self = Self(0x20);

    pub const MONEY: Self = Self(0x40);
    pub const TRANSFER: Self = Self(0x41);

    pub const COMMAND: Self = Self(0x88);
    pub const HISTORY: Self = Self(0x89);

    pub const ARRAY: Self = Self(0xCA);
    pub const FORWARD: Self = Self(0xFF);

    pub fn code(self) -> u32 {
        self.0
    }

    fn has_bit(self, bit: u32) -> bool {
        self.0 & (1 << bit) != 0
    }

    pub fn is_text(self) -> bool {
        self.has_bit(0)
    }

    pub fn is_visual(self) -> bool {
        self.has_bit(1)
    }

    pub fn is_audible(self) -> bool {
        self.has_bit(2)
    }

    pub fn is_machine_directed(self) -> bool {
        self.has_bit(3)
    }

    pub fn is_remote_payload(self) -> bool {
        self.has_bit(4)
    }

    pub fn embeds_third_party(self) -> bool {
        self.has_bit(5)
    }

    pub fn carries_value(self) -> bool {
        self.has_bit(6)
    }

    pub fn is_system(self) -> bool {
        self.has_bit(7)
    }

    /// File, image, audio and video share one record layout.
    pub fn is_file_family(self) -> bool {
        matches!(self, Self::FILE | Self::IMAGE | Self::AUDIO | Self::VIDEO)
    }
}

impl From<u32> for ContentType {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}
