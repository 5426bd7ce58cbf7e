use std::fmt;

/// TFTP block number
///
/// Block 0 is only ever acknowledged (the server's reply to a WRQ); file data
/// starts at block 1. Arithmetic wraps modulo 65536 so transfers larger than
/// 32 MiB keep going after block 65535.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Block(u16);

impl Block {
    /// Block acknowledged in reply to a write request
    pub const ZERO: Block = Block(0);
    /// First block that carries file data
    pub const FIRST: Block = Block(1);

    pub const fn new(n: u16) -> Self {
        Block(n)
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    /// Following block number, wrapping 65535 to 0
    pub const fn next(self) -> Self {
        Block(self.0.wrapping_add(1))
    }

    /// Preceding block number, wrapping 0 to 65535
    pub const fn prev(self) -> Self {
        Block(self.0.wrapping_sub(1))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_where_the_protocol_starts() {
        assert_eq!(Block::ZERO.get(), 0);
        assert_eq!(Block::FIRST.get(), 1);
        assert_eq!(Block::ZERO.next(), Block::FIRST);
        assert_eq!(Block::default(), Block::ZERO);
    }

    #[test]
    fn wraps_around() {
        assert_eq!(Block::new(65535).next(), Block::ZERO);
        assert_eq!(Block::ZERO.prev(), Block::new(65535));
        assert_eq!(Block::new(65535).next().next(), Block::FIRST);
    }

    #[test]
    fn full_cycle_returns_to_start() {
        let mut block = Block::FIRST;
        for _ in 0..=u16::MAX {
            block = block.next();
        }
        assert_eq!(block, Block::FIRST);
    }
}
