//! Program ROM and data RAM.
//!
//! The ROM is an opaque, externally supplied byte image addressed by the
//! 10-bit program counter. The RAM is 32 nibbles addressed by the B
//! register. Both are validated once, when they are built; reads and
//! writes afterwards cannot fail.

use crate::bits::{Address, Nibble};
use serde::{Serialize, Deserialize};

/// ROM image sizes the core accepts.
pub const ROM_SIZES: [usize; 3] = [512, 768, 1024];

/// The number of RAM cells.
pub const RAM_SIZE: usize = 32;

/// Read-only program memory as seen by the core.
///
/// Implementations must be pure: the same address always yields the same
/// byte. Two lock-stepped cores rely on this.
pub trait RomBus {
    /// Read the opcode byte at a program address.
    fn read(&self, addr: Address) -> u8;

    /// Size of the image in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A ROM image held in memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rom {
    bytes: Vec<u8>,
}

impl Rom {
    /// Wrap a ROM image, checking its size.
    pub fn new(bytes: Vec<u8>) -> Result<Self, MemoryError> {
        if !ROM_SIZES.contains(&bytes.len()) {
            return Err(MemoryError::RomSize(bytes.len()));
        }
        Ok(Self { bytes })
    }

    /// Copy a ROM image from a slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MemoryError> {
        Self::new(bytes.to_vec())
    }

    /// The raw image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl RomBus for Rom {
    /// Addresses past the end of a short image mirror onto its start.
    #[inline]
    fn read(&self, addr: Address) -> u8 {
        self.bytes[addr.value() as usize % self.bytes.len()]
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }
}

impl std::fmt::Debug for Rom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.bytes.iter().filter(|&&b| b != 0).count();
        f.debug_struct("Rom")
            .field("size", &self.bytes.len())
            .field("non_zero_bytes", &used)
            .finish()
    }
}

/// ROM backed by a read function.
///
/// The declared size is validated like an in-memory image; `read` is
/// called with addresses already reduced modulo that size.
pub struct RomFn<F> {
    size: usize,
    read: F,
}

impl<F: Fn(Address) -> u8> RomFn<F> {
    pub fn new(size: usize, read: F) -> Result<Self, MemoryError> {
        if !ROM_SIZES.contains(&size) {
            return Err(MemoryError::RomSize(size));
        }
        Ok(Self { size, read })
    }
}

impl<F: Fn(Address) -> u8> RomBus for RomFn<F> {
    #[inline]
    fn read(&self, addr: Address) -> u8 {
        (self.read)(Address::new((addr.value() as usize % self.size) as u16))
    }

    fn len(&self) -> usize {
        self.size
    }
}

/// Direction of a RAM access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Read,
    Write,
}

/// The most recent RAM access, kept for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamAccess {
    pub addr: u8,
    pub direction: Access,
    pub value: Nibble,
}

/// Data RAM: 32 four-bit cells.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ram {
    cells: [Nibble; RAM_SIZE],
    last_access: Option<RamAccess>,
}

impl Ram {
    /// Create a RAM with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: [Nibble::zero(); RAM_SIZE],
            last_access: None,
        }
    }

    /// Build a RAM from raw cell values.
    ///
    /// Rejects anything other than exactly 32 cells of 4 bits each.
    pub fn from_cells(cells: &[u8]) -> Result<Self, MemoryError> {
        if cells.len() != RAM_SIZE {
            return Err(MemoryError::RamSize(cells.len()));
        }
        let mut ram = Self::new();
        for (addr, &value) in cells.iter().enumerate() {
            ram.cells[addr] = Nibble::try_from(value)
                .map_err(|_| MemoryError::RamValue { addr, value })?;
        }
        Ok(ram)
    }

    /// Read a cell. The address is masked to 5 bits.
    #[inline]
    pub fn read(&mut self, addr: u8) -> Nibble {
        let addr = addr & (RAM_SIZE as u8 - 1);
        let value = self.cells[addr as usize];
        self.last_access = Some(RamAccess { addr, direction: Access::Read, value });
        value
    }

    /// Write a cell. The address is masked to 5 bits.
    #[inline]
    pub fn write(&mut self, addr: u8, value: Nibble) {
        let addr = addr & (RAM_SIZE as u8 - 1);
        self.cells[addr as usize] = value;
        self.last_access = Some(RamAccess { addr, direction: Access::Write, value });
    }

    /// Look at a cell without recording an access.
    #[inline]
    pub fn peek(&self, addr: u8) -> Nibble {
        self.cells[(addr as usize) % RAM_SIZE]
    }

    /// The most recent read or write.
    pub fn last_access(&self) -> Option<RamAccess> {
        self.last_access
    }

    /// All cells, lowest address first.
    pub fn cells(&self) -> &[Nibble; RAM_SIZE] {
        &self.cells
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dump: String = self.cells.iter().map(|c| format!("{:X}", c.value())).collect();
        f.debug_struct("Ram")
            .field("cells", &dump)
            .field("last_access", &self.last_access)
            .finish()
    }
}

/// Errors raised when a memory collaborator is outside the core's envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// ROM image has an unsupported size.
    RomSize(usize),
    /// RAM does not have exactly 32 cells.
    RamSize(usize),
    /// A RAM cell holds more than 4 bits.
    RamValue { addr: usize, value: u8 },
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::RomSize(size) => {
                write!(f, "ROM image of {} bytes (expected 512, 768 or 1024)", size)
            }
            MemoryError::RamSize(size) => {
                write!(f, "RAM of {} cells (expected {})", size, RAM_SIZE)
            }
            MemoryError::RamValue { addr, value } => {
                write!(f, "RAM cell {} holds {:#x}, wider than 4 bits", addr, value)
            }
        }
    }
}

impl std::error::Error for MemoryError {}
